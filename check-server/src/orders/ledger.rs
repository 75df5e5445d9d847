//! Seat ledger: contiguous 1..N seat numbering with positional shifting
//!
//! Seats are not rows. The ledger is the pair (`base_seat_count`,
//! `extra_seat_count`) on the order plus the `seat` field of every item;
//! inserting or removing a seat reshapes that positional index atomically
//! while preserving which guest owns which item. No items are ever created
//! or destroyed here — removal moves orphaned items to the shared sentinel
//! instead of deleting them.
//!
//! Round-trip guarantee: `insert_seat(p)` immediately followed by
//! `remove_seat(p)` restores the prior seat-to-item mapping and
//! `extra_seat_count` for every item not touched in between.

use super::error::OrderError;
use shared::money::allocate_evenly;
use shared::order::{Order, SeatAssignment, SeatStatus, SeatView, SEAT_ACTIVE_WINDOW_MS};

/// Result of a seat-shape mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatShift {
    pub new_total_seats: u32,
    pub new_seat_version: u64,
    /// Items whose seat was removed and which now sit in the shared pool
    pub items_moved_to_shared: Vec<String>,
}

/// Insert a seat at `position` (1..=total+1), shifting existing seats up.
///
/// Bumps `seat_version`; the caller is responsible for having checked the
/// expected seat version first.
pub fn insert_seat(order: &mut Order, position: u32) -> Result<SeatShift, OrderError> {
    let total = order.total_seats();
    if position < 1 || position > total + 1 {
        return Err(OrderError::InvalidPosition {
            position,
            max: total + 1,
        });
    }

    for item in &mut order.items {
        match &mut item.seat {
            SeatAssignment::Seat { number } if *number >= position => *number += 1,
            SeatAssignment::Shared { seats } => {
                for seat in seats.iter_mut() {
                    if *seat >= position {
                        *seat += 1;
                    }
                }
            }
            _ => {}
        }
    }

    order.extra_seat_count += 1;
    order.seat_version += 1;
    order.updated_at = shared::now_millis();

    Ok(SeatShift {
        new_total_seats: order.total_seats(),
        new_seat_version: order.seat_version,
        items_moved_to_shared: Vec::new(),
    })
}

/// Remove the seat at `position` (1..=total), shifting higher seats down.
///
/// Items owned by exactly that seat are moved to the shared sentinel, never
/// silently deleted. Shared items lose the seat from their explicit set.
pub fn remove_seat(order: &mut Order, position: u32) -> Result<SeatShift, OrderError> {
    let total = order.total_seats();
    if position < 1 || position > total {
        return Err(OrderError::InvalidPosition {
            position,
            max: total,
        });
    }

    let mut moved = Vec::new();
    for item in &mut order.items {
        match &mut item.seat {
            SeatAssignment::Seat { number } => {
                if *number == position {
                    moved.push(item.id.clone());
                    item.seat = SeatAssignment::shared_all();
                } else if *number > position {
                    *number -= 1;
                }
            }
            SeatAssignment::Shared { seats } => {
                let had_explicit = !seats.is_empty();
                seats.retain(|s| *s != position);
                for seat in seats.iter_mut() {
                    if *seat > position {
                        *seat -= 1;
                    }
                }
                // An explicit set emptied by the removal widens to all seats
                if had_explicit && seats.is_empty() {
                    moved.push(item.id.clone());
                }
            }
        }
    }

    order.extra_seat_count -= 1;
    order.seat_version += 1;
    order.updated_at = shared::now_millis();

    Ok(SeatShift {
        new_total_seats: order.total_seats(),
        new_seat_version: order.seat_version,
        items_moved_to_shared: moved,
    })
}

/// Compute the derived per-seat views (never persisted).
///
/// Shared items contribute an evenly allocated slice of their line total to
/// every seat they involve, with the same largest-remainder rule the split
/// engine uses, so the seat views always foot to the order totals.
pub fn seat_views(order: &Order, now: i64) -> Vec<SeatView> {
    let total_seats = order.total_seats();
    let mut views: Vec<SeatView> = (1..=total_seats)
        .map(|n| SeatView {
            seat_number: n,
            subtotal: shared::Money::ZERO,
            total: shared::Money::ZERO,
            item_ids: Vec::new(),
            status: SeatStatus::Empty,
        })
        .collect();

    let mut last_touch = vec![0i64; total_seats as usize];
    let mut all_printed = vec![true; total_seats as usize];
    let mut has_items = vec![false; total_seats as usize];

    for item in order.active_items() {
        match &item.seat {
            SeatAssignment::Seat { number } => {
                let idx = (*number as usize).saturating_sub(1);
                if let Some(view) = views.get_mut(idx) {
                    view.subtotal += item.line_total();
                    view.total += item.line_total() + item.tax;
                    view.item_ids.push(item.id.clone());
                    has_items[idx] = true;
                    last_touch[idx] = last_touch[idx].max(item.added_at);
                    all_printed[idx] &= item.printed_at.is_some();
                }
            }
            SeatAssignment::Shared { .. } => {
                let involved: Vec<u32> =
                    (1..=total_seats).filter(|s| item.seat.involves(*s)).collect();
                if involved.is_empty() {
                    continue;
                }
                let sub_shares = allocate_evenly(item.line_total(), involved.len());
                let tax_shares = allocate_evenly(item.tax, involved.len());
                for (i, seat) in involved.iter().enumerate() {
                    let idx = (*seat as usize) - 1;
                    views[idx].subtotal += sub_shares[i];
                    views[idx].total += sub_shares[i] + tax_shares[i];
                    views[idx].item_ids.push(item.id.clone());
                    has_items[idx] = true;
                    last_touch[idx] = last_touch[idx].max(item.added_at);
                    all_printed[idx] &= item.printed_at.is_some();
                }
            }
        }
    }

    for (idx, view) in views.iter_mut().enumerate() {
        view.status = if !has_items[idx] {
            SeatStatus::Empty
        } else if order.status == shared::order::OrderStatus::Paid {
            SeatStatus::Paid
        } else if now - last_touch[idx] <= SEAT_ACTIVE_WINDOW_MS {
            SeatStatus::Active
        } else if all_printed[idx] {
            SeatStatus::Printed
        } else {
            SeatStatus::Stale
        };
    }

    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::Money;
    use shared::order::{ItemKind, ItemStatus, OrderItem, OrderType};

    fn item(id: &str, seat: SeatAssignment, cents: i64) -> OrderItem {
        OrderItem {
            id: id.into(),
            name: id.into(),
            quantity: 1,
            unit_price: Money(cents),
            tax: Money::ZERO,
            status: ItemStatus::Active,
            kind: ItemKind::Item,
            seat,
            origin_item_id: None,
            printed_at: None,
            added_at: 0,
        }
    }

    fn order_with_seats() -> Order {
        let mut order = Order::new_root(31, None, "emp".into(), OrderType::DineIn, 3);
        order.items.push(item("a", SeatAssignment::seat(1), 1000));
        order.items.push(item("b", SeatAssignment::seat(2), 2000));
        order.items.push(item("c", SeatAssignment::seat(3), 3000));
        order
            .items
            .push(item("s", SeatAssignment::Shared { seats: vec![1, 3] }, 900));
        order.recalculate_from_items();
        order
    }

    #[test]
    fn test_insert_shifts_seats_at_and_above_position() {
        let mut order = order_with_seats();
        let shift = insert_seat(&mut order, 2).unwrap();

        assert_eq!(shift.new_total_seats, 4);
        assert_eq!(order.extra_seat_count, 1);
        assert_eq!(order.items[0].seat, SeatAssignment::seat(1));
        assert_eq!(order.items[1].seat, SeatAssignment::seat(3));
        assert_eq!(order.items[2].seat, SeatAssignment::seat(4));
        // shared set follows the shift
        assert_eq!(
            order.items[3].seat,
            SeatAssignment::Shared { seats: vec![1, 4] }
        );
        assert!(shift.items_moved_to_shared.is_empty());
    }

    #[test]
    fn test_remove_moves_orphans_to_shared() {
        let mut order = order_with_seats();
        let shift = remove_seat(&mut order, 2).unwrap();

        assert_eq!(shift.new_total_seats, 2);
        assert_eq!(shift.items_moved_to_shared, vec!["b".to_string()]);
        assert_eq!(order.items[1].seat, SeatAssignment::shared_all());
        // seat 3 slid down to 2
        assert_eq!(order.items[2].seat, SeatAssignment::seat(2));
        assert_eq!(
            order.items[3].seat,
            SeatAssignment::Shared { seats: vec![1, 2] }
        );
    }

    #[test]
    fn test_insert_then_remove_round_trips() {
        let original = order_with_seats();
        let mut order = original.clone();

        insert_seat(&mut order, 2).unwrap();
        let shift = remove_seat(&mut order, 2).unwrap();

        assert!(shift.items_moved_to_shared.is_empty());
        assert_eq!(order.extra_seat_count, original.extra_seat_count);
        for (before, after) in original.items.iter().zip(order.items.iter()) {
            assert_eq!(before.seat, after.seat, "item {}", before.id);
        }
        // seat_version advanced twice; the shape itself round-tripped
        assert_eq!(order.seat_version, original.seat_version + 2);
    }

    #[test]
    fn test_position_bounds() {
        let mut order = order_with_seats();
        assert!(matches!(
            insert_seat(&mut order, 0),
            Err(OrderError::InvalidPosition { .. })
        ));
        assert!(matches!(
            insert_seat(&mut order, 5),
            Err(OrderError::InvalidPosition { .. })
        ));
        assert!(matches!(
            remove_seat(&mut order, 4),
            Err(OrderError::InvalidPosition { .. })
        ));
        // insert at total+1 is legal (append)
        assert!(insert_seat(&mut order, 4).is_ok());
    }

    #[test]
    fn test_seat_views_allocate_shared_exactly() {
        let order = order_with_seats();
        let views = seat_views(&order, 0);
        assert_eq!(views.len(), 3);

        // 900 shared over seats {1,3} → 450 each
        assert_eq!(views[0].subtotal, Money(1450));
        assert_eq!(views[1].subtotal, Money(2000));
        assert_eq!(views[2].subtotal, Money(3450));

        let footed: Money = views.iter().map(|v| v.subtotal).sum();
        assert_eq!(footed, order.subtotal);
    }

    #[test]
    fn test_seat_status_lifecycle() {
        let mut order = order_with_seats();
        // recent touch → Active
        let now = 1_000;
        for item in &mut order.items {
            item.added_at = now;
        }
        let views = seat_views(&order, now);
        assert!(views.iter().all(|v| v.status == SeatStatus::Active));

        // stale, unprinted → Stale; stale and printed → Printed
        let later = now + SEAT_ACTIVE_WINDOW_MS + 1;
        let views = seat_views(&order, later);
        assert!(views.iter().all(|v| v.status == SeatStatus::Stale));

        for item in &mut order.items {
            item.printed_at = Some(now);
        }
        let views = seat_views(&order, later);
        assert!(views.iter().all(|v| v.status == SeatStatus::Printed));

        // empty seat reports Empty
        let mut sparse = Order::new_root(1, None, "emp".into(), OrderType::DineIn, 2);
        sparse.items.push(item("x", SeatAssignment::seat(1), 100));
        let views = seat_views(&sparse, 0);
        assert_eq!(views[1].status, SeatStatus::Empty);
    }
}
