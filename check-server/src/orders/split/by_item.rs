//! By-item split: move the named items into one new child check
//!
//! Ownership transfer, never duplication: after the split the child's items
//! and the source's remaining items are disjoint and their union is exactly
//! the source's items before. The source must retain at least one active
//! item — moving everything is rejected (dissolve the order explicitly
//! instead).

use super::{ChildPlan, SourceAfter, SplitPlan};
use crate::orders::error::OrderError;
use shared::money::Money;
use shared::order::{Order, OrderItem, OrderStatus};
use std::collections::HashSet;

pub(super) fn plan_by_item(
    source: &Order,
    item_ids: &[String],
    next_split_index: u32,
) -> Result<SplitPlan, OrderError> {
    if item_ids.is_empty() {
        return Err(OrderError::Validation(
            "A by-item split must name at least one item".to_string(),
        ));
    }

    let mut requested: HashSet<&str> = HashSet::new();
    for id in item_ids {
        if !requested.insert(id.as_str()) {
            return Err(OrderError::Validation(format!(
                "Item {} named twice in split",
                id
            )));
        }
    }

    let mut moved: Vec<OrderItem> = Vec::with_capacity(item_ids.len());
    let mut retained_active = 0usize;
    for item in source.active_items() {
        if requested.remove(item.id.as_str()) {
            moved.push(item.clone());
        } else {
            retained_active += 1;
        }
    }

    if let Some(missing) = requested.into_iter().next() {
        return Err(OrderError::ItemNotFound(missing.to_string()));
    }
    if retained_active == 0 {
        return Err(OrderError::Validation(
            "Cannot move every item to a new check; the source must retain at least one"
                .to_string(),
        ));
    }

    let moved_item_ids: Vec<String> = moved.iter().map(|i| i.id.clone()).collect();
    let subtotal: Money = moved.iter().map(|i| i.line_total()).sum();
    let tax_total: Money = moved.iter().map(|i| i.tax).sum();

    let child = ChildPlan {
        split_index: next_split_index,
        items: moved,
        moved_item_ids: moved_item_ids.clone(),
        subtotal,
        tax_total,
        discount_total: Money::ZERO,
        tip_total: Money::ZERO,
        total: subtotal + tax_total,
    };

    // The source keeps its discounts and tips; only item value leaves.
    let source_after = SourceAfter {
        status: OrderStatus::Open,
        subtotal: source.subtotal - subtotal,
        tax_total: source.tax_total - tax_total,
        discount_total: source.discount_total,
        tip_total: source.tip_total,
        total: source.total - subtotal - tax_total,
    };

    Ok(SplitPlan {
        children: vec![child],
        removed_item_ids: moved_item_ids,
        source_after,
    })
}
