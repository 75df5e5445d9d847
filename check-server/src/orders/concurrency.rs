//! Optimistic concurrency control
//!
//! Every mutating call carries the version its caller last observed. The
//! check runs inside the same write transaction as the mutation: re-read,
//! compare, abort with `Conflict` on mismatch, otherwise apply and bump by
//! exactly one as the final write. Retries are the caller's problem — a
//! stale caller has to re-fetch before it can make a correct decision, so
//! nothing here ever auto-retries.
//!
//! Item/financial edits and seat-shape edits use independent counters
//! (`version` vs `seat_version`) so a voided item and a concurrent seat
//! insert do not spuriously conflict with each other.

use super::error::OrderError;
use shared::order::Order;

/// Validate the item/financial version a caller observed
pub fn check_version(order: &Order, expected: u64) -> Result<(), OrderError> {
    if order.version != expected {
        return Err(OrderError::Conflict {
            order_id: order.id.clone(),
            expected,
            current: order.version,
        });
    }
    Ok(())
}

/// Validate the seat-shape version a caller observed
pub fn check_seat_version(order: &Order, expected: u64) -> Result<(), OrderError> {
    if order.seat_version != expected {
        return Err(OrderError::Conflict {
            order_id: order.id.clone(),
            expected,
            current: order.seat_version,
        });
    }
    Ok(())
}

/// Advance the item/financial version; call once, as the last mutation step
pub fn bump_version(order: &mut Order) {
    order.version += 1;
    order.updated_at = shared::now_millis();
}

/// Advance the seat-shape version; call once, as the last mutation step
pub fn bump_seat_version(order: &mut Order) {
    order.seat_version += 1;
    order.updated_at = shared::now_millis();
}
