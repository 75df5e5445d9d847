//! Split engine: pure computation of a target order graph
//!
//! Four strategies, one contract: given a source order, produce a
//! [`SplitPlan`] describing the children to create and the shape of the
//! source afterwards. Nothing here touches storage — the lifecycle manager
//! applies a plan inside its single write transaction, so a plan that fails
//! validation costs nothing.
//!
//! Every plan is checked before it leaves this module: child totals are
//! non-negative, the outputs (children plus the remainder on the source)
//! sum exactly to the pre-split total, and the live-children cap holds.

mod by_item;
mod by_seat;
mod custom_amount;
mod even;

use super::error::OrderError;
use shared::money::Money;
use shared::order::{Order, OrderItem, OrderStatus, SplitStrategy, MAX_LIVE_CHILDREN};

/// One child order to be created by the manager
#[derive(Debug, Clone)]
pub struct ChildPlan {
    pub split_index: u32,
    /// Items the child will own: transferred originals and/or derived claims
    pub items: Vec<OrderItem>,
    /// Ids of real items transferred from the source into this child
    pub moved_item_ids: Vec<String>,
    pub subtotal: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub tip_total: Money,
    pub total: Money,
}

/// The source order's accounting after the split is applied
#[derive(Debug, Clone)]
pub struct SourceAfter {
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub tip_total: Money,
    pub total: Money,
}

/// A computed, validated split
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub children: Vec<ChildPlan>,
    /// Items leaving the source (transferred to a child or consumed into
    /// derived shares)
    pub removed_item_ids: Vec<String>,
    pub source_after: SourceAfter,
}

/// Compute a split plan for `source` under `strategy`.
///
/// `live_children` is the number of live children the source already has;
/// `next_split_index` is the index the first new child should get.
pub fn plan_split(
    source: &Order,
    live_children: usize,
    next_split_index: u32,
    strategy: &SplitStrategy,
) -> Result<SplitPlan, OrderError> {
    // The tree is one level deep: a check never becomes a parent itself
    if source.parent_order_id.is_some() {
        return Err(OrderError::Validation(format!(
            "Order {} is a split check; split checks cannot be split again",
            source.id
        )));
    }
    if source.status != OrderStatus::Open {
        return Err(OrderError::Validation(format!(
            "Order {} is not open (status {:?})",
            source.id, source.status
        )));
    }

    let plan = match strategy {
        SplitStrategy::Even { ways } => {
            require_unsplit(source, live_children, "an even split")?;
            even::plan_even(source, *ways)?
        }
        SplitStrategy::BySeat => {
            require_unsplit(source, live_children, "a by-seat split")?;
            by_seat::plan_by_seat(source)?
        }
        SplitStrategy::ByItem { item_ids } => {
            require_no_payments(source)?;
            by_item::plan_by_item(source, item_ids, next_split_index)?
        }
        SplitStrategy::CustomAmount { amount } => {
            custom_amount::plan_custom_amount(source, *amount, next_split_index)?
        }
    };

    let live_after = live_children + plan.children.len();
    if live_after > MAX_LIVE_CHILDREN {
        return Err(OrderError::TooManySplits(live_after));
    }

    verify_plan(source, &plan)?;
    Ok(plan)
}

/// Even and by-seat splits repartition the whole balance: they only make
/// sense on an order that has no checks and no payments yet.
fn require_unsplit(
    source: &Order,
    live_children: usize,
    what: &str,
) -> Result<(), OrderError> {
    if live_children > 0 {
        return Err(OrderError::Validation(format!(
            "Order {} already has split checks; {} must start from an unsplit order",
            source.id, what
        )));
    }
    require_no_payments(source)
}

fn require_no_payments(source: &Order) -> Result<(), OrderError> {
    if source.has_payments() {
        return Err(OrderError::Validation(format!(
            "Order {} has recorded payments; only custom-amount splits may carve a partially paid order",
            source.id
        )));
    }
    Ok(())
}

/// Cross-strategy invariants: non-negative children, exact balance.
fn verify_plan(source: &Order, plan: &SplitPlan) -> Result<(), OrderError> {
    for child in &plan.children {
        if child.total.is_negative() {
            return Err(OrderError::Validation(format!(
                "Split would create a negative check ({})",
                child.total
            )));
        }
        let identity = child.subtotal + child.tax_total - child.discount_total + child.tip_total;
        if identity != child.total {
            return Err(OrderError::Validation(
                "Split produced an unbalanced child check".to_string(),
            ));
        }
    }

    let children_total: Money = plan.children.iter().map(|c| c.total).sum();
    if children_total + plan.source_after.total != source.total {
        return Err(OrderError::Validation(format!(
            "Split does not balance: children {} + remainder {} != total {}",
            children_total, plan.source_after.total, source.total
        )));
    }
    Ok(())
}

/// Shell accounting for a fully distributed source
pub(super) fn source_as_shell() -> SourceAfter {
    SourceAfter {
        status: OrderStatus::Split,
        subtotal: Money::ZERO,
        tax_total: Money::ZERO,
        discount_total: Money::ZERO,
        tip_total: Money::ZERO,
        total: Money::ZERO,
    }
}
