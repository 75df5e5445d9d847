//! By-seat split: one child check per populated seat
//!
//! Seat-owned items transfer to their seat's child (ownership transfer,
//! never a copy). Shared items are consumed into derived claim shares, one
//! per participating child, allocated with the largest-remainder rule. A
//! seat with no items produces no child.
//!
//! Shared items with an explicit seat set are divided across the populated
//! seats in that set; when none of the listed seats ended up with a child,
//! the item falls back to all children so its cost is never stranded.

use super::{source_as_shell, ChildPlan, SplitPlan};
use crate::orders::error::OrderError;
use shared::money::{allocate_evenly, Money};
use shared::order::{ItemKind, ItemStatus, Order, OrderItem, SeatAssignment};
use std::collections::BTreeMap;

pub(super) fn plan_by_seat(source: &Order) -> Result<SplitPlan, OrderError> {
    // Seat number → owned items, ascending
    let mut by_seat: BTreeMap<u32, Vec<&OrderItem>> = BTreeMap::new();
    let mut shared: Vec<&OrderItem> = Vec::new();
    for item in source.active_items() {
        match item.seat.seat_number() {
            Some(n) => by_seat.entry(n).or_default().push(item),
            None => shared.push(item),
        }
    }

    if by_seat.len() < 2 {
        return Err(OrderError::InsufficientSeats(by_seat.len()));
    }

    let populated: Vec<u32> = by_seat.keys().copied().collect();
    let n = populated.len();
    let now = shared::now_millis();

    let mut children: Vec<ChildPlan> = Vec::with_capacity(n);
    let mut removed_item_ids: Vec<String> = Vec::new();

    for (i, owned) in by_seat.values().enumerate() {
        let mut items: Vec<OrderItem> = Vec::with_capacity(owned.len());
        let mut moved_item_ids = Vec::with_capacity(owned.len());
        for item in owned {
            moved_item_ids.push(item.id.clone());
            removed_item_ids.push(item.id.clone());
            items.push((*item).clone());
        }
        children.push(ChildPlan {
            split_index: (i + 1) as u32,
            items,
            moved_item_ids,
            subtotal: Money::ZERO,
            tax_total: Money::ZERO,
            discount_total: Money::ZERO,
            tip_total: Money::ZERO,
            total: Money::ZERO,
        });
    }

    // Shared items become derived claim shares on the participating children
    for item in shared {
        removed_item_ids.push(item.id.clone());

        let mut participants: Vec<usize> = populated
            .iter()
            .enumerate()
            .filter(|(_, seat)| item.seat.involves(**seat))
            .map(|(i, _)| i)
            .collect();
        if participants.is_empty() {
            participants = (0..n).collect();
        }

        let sub_shares = allocate_evenly(item.line_total(), participants.len());
        let tax_shares = allocate_evenly(item.tax, participants.len());
        for (k, &child_idx) in participants.iter().enumerate() {
            children[child_idx].items.push(OrderItem {
                id: uuid::Uuid::new_v4().to_string(),
                name: format!("{} (shared)", item.name),
                quantity: 1,
                unit_price: sub_shares[k],
                tax: tax_shares[k],
                status: ItemStatus::Active,
                kind: ItemKind::BalanceClaim,
                seat: SeatAssignment::seat(populated[child_idx]),
                origin_item_id: Some(item.id.clone()),
                printed_at: item.printed_at,
                added_at: now,
            });
        }
    }

    // Parent-level discount and tip spread across the children evenly
    let discounts = allocate_evenly(source.discount_total, n);
    let tips = allocate_evenly(source.tip_total, n);

    for (i, child) in children.iter_mut().enumerate() {
        child.subtotal = child.items.iter().map(|it| it.line_total()).sum();
        child.tax_total = child.items.iter().map(|it| it.tax).sum();
        child.discount_total = discounts[i];
        child.tip_total = tips[i];
        child.total = child.subtotal + child.tax_total - child.discount_total + child.tip_total;
    }

    Ok(SplitPlan {
        children,
        removed_item_ids,
        source_after: source_as_shell(),
    })
}
