//! Custom-amount split: carve a payment-only child from the balance
//!
//! The child is not bound to specific items; it holds one synthetic balance
//! claim for `amount` of the parent's outstanding balance.
//!
//! Accounting rule (the source material leaves this open, so it is decided
//! here and recorded in DESIGN.md): tax, discount and tip are allocated to
//! the child floor-proportionally in the ratio of `amount` to the
//! outstanding balance; the rounding residue always stays with the parent.
//! The claim's subtotal is then derived so the child's total is exactly
//! `amount`.

use super::{ChildPlan, SourceAfter, SplitPlan};
use crate::orders::error::OrderError;
use shared::money::{allocate_proportional, Money};
use shared::order::{ItemKind, ItemStatus, Order, OrderItem, OrderStatus, SeatAssignment};

pub(super) fn plan_custom_amount(
    source: &Order,
    amount: Money,
    next_split_index: u32,
) -> Result<SplitPlan, OrderError> {
    let outstanding = source.outstanding();
    if amount <= Money::ZERO {
        return Err(OrderError::Validation(format!(
            "Split amount must be positive, got {}",
            amount
        )));
    }
    if amount > outstanding {
        return Err(OrderError::Validation(format!(
            "Split amount {} exceeds outstanding balance {}",
            amount, outstanding
        )));
    }

    let tax_total = allocate_proportional(source.tax_total, amount, outstanding);
    let discount_total = allocate_proportional(source.discount_total, amount, outstanding);
    let tip_total = allocate_proportional(source.tip_total, amount, outstanding);
    let subtotal = amount - tax_total + discount_total - tip_total;

    let claim = OrderItem {
        id: uuid::Uuid::new_v4().to_string(),
        name: format!("Balance ({})", amount),
        quantity: 1,
        unit_price: subtotal,
        tax: tax_total,
        status: ItemStatus::Active,
        kind: ItemKind::BalanceClaim,
        seat: SeatAssignment::shared_all(),
        origin_item_id: Some(source.id.clone()),
        printed_at: None,
        added_at: shared::now_millis(),
    };

    let child = ChildPlan {
        split_index: next_split_index,
        items: vec![claim],
        moved_item_ids: Vec::new(),
        subtotal,
        tax_total,
        discount_total,
        tip_total,
        total: amount,
    };

    let source_after = SourceAfter {
        status: OrderStatus::Open,
        subtotal: source.subtotal - subtotal,
        tax_total: source.tax_total - tax_total,
        discount_total: source.discount_total - discount_total,
        tip_total: source.tip_total - tip_total,
        total: source.total - amount,
    };

    Ok(SplitPlan {
        children: vec![child],
        removed_item_ids: Vec::new(),
        source_after,
    })
}
