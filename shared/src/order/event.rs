//! Change notifications published after each committed mutation
//!
//! Delivery is at-least-once and carries no authoritative payload:
//! subscribers must treat a notification as "something changed, re-fetch".
//! Publish failures never affect the committed transaction.

use serde::{Deserialize, Serialize};

/// What kind of mutation committed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChangeKind {
    Opened,
    ItemsChanged,
    SeatsChanged,
    Split,
    CheckCreated,
    CheckDeleted,
    Merged,
    PaymentRecorded,
    Paid,
    Voided,
}

/// Post-commit change event, keyed by order id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChanged {
    #[serde(rename = "type")]
    pub kind: OrderChangeKind,
    pub order_id: String,
    /// Set when the changed order belongs to a split tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Committed version after the mutation
    pub version: u64,
    /// Committed seat version after the mutation
    pub seat_version: u64,
    pub timestamp: i64,
}

impl OrderChanged {
    pub fn new(kind: OrderChangeKind, order: &crate::order::Order) -> Self {
        Self {
            kind,
            order_id: order.id.clone(),
            parent_id: order.parent_order_id.clone(),
            version: order.version,
            seat_version: order.seat_version,
            timestamp: crate::now_millis(),
        }
    }
}
