//! Even split: N equal shares of the whole balance
//!
//! Items stay on the parent (the dishes do not move between guests); each
//! child is a payment shell holding one synthetic balance claim. Every
//! money component is allocated independently with the largest-remainder
//! rule, so the per-child identity and the tree-wide balance both hold
//! exactly: `sum(shares) == total`, `max - min <= 1` minor unit, extra
//! units to the lowest split indexes first.

use super::{source_as_shell, ChildPlan, SplitPlan};
use crate::orders::error::OrderError;
use shared::money::allocate_evenly;
use shared::order::{ItemKind, ItemStatus, Order, OrderItem, SeatAssignment};

pub(super) fn plan_even(source: &Order, ways: u32) -> Result<SplitPlan, OrderError> {
    if ways < 2 {
        return Err(OrderError::Validation(format!(
            "An even split needs at least 2 ways, got {}",
            ways
        )));
    }

    let n = ways as usize;
    let subs = allocate_evenly(source.subtotal, n);
    let taxes = allocate_evenly(source.tax_total, n);
    let discounts = allocate_evenly(source.discount_total, n);
    let tips = allocate_evenly(source.tip_total, n);

    let now = shared::now_millis();
    let children = (0..n)
        .map(|i| {
            let split_index = (i + 1) as u32;
            let claim = OrderItem {
                id: uuid::Uuid::new_v4().to_string(),
                name: format!("Even share {}/{}", split_index, ways),
                quantity: 1,
                unit_price: subs[i],
                tax: taxes[i],
                status: ItemStatus::Active,
                kind: ItemKind::BalanceClaim,
                seat: SeatAssignment::shared_all(),
                origin_item_id: Some(source.id.clone()),
                printed_at: None,
                added_at: now,
            };
            ChildPlan {
                split_index,
                items: vec![claim],
                moved_item_ids: Vec::new(),
                subtotal: subs[i],
                tax_total: taxes[i],
                discount_total: discounts[i],
                tip_total: tips[i],
                total: subs[i] + taxes[i] - discounts[i] + tips[i],
            }
        })
        .collect();

    Ok(SplitPlan {
        children,
        removed_item_ids: Vec::new(),
        source_after: source_as_shell(),
    })
}
