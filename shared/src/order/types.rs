//! The order aggregate: orders, line items, seats, split strategies
//!
//! An order is the unit of payment. Splitting derives child orders from a
//! root order; children reference the parent by id only (`parent_order_id`),
//! there are no back-pointer collections held outside the store. The money
//! fields on [`Order`] are the authoritative accounting — item sums feed
//! them whenever item ownership changes, and the split strategies adjust
//! them componentwise so that the tree always balances to the minor unit.

use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Hard cap of live (non-deleted) children per split parent
pub const MAX_LIVE_CHILDREN: usize = 20;

/// How long after the last item touch a seat still counts as active (10 min)
pub const SEAT_ACTIVE_WINDOW_MS: i64 = 10 * 60 * 1000;

// ============================================================================
// Status enums
// ============================================================================

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepting items, seats and payments
    #[default]
    Open,
    /// Pure accounting shell: balance has moved to >= 2 live children
    Split,
    /// Fully paid (terminal)
    Paid,
    /// Voided by an operator (terminal)
    Voided,
    /// Folded into another order (terminal)
    Merged,
    /// Cancelled before any financial activity (terminal)
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Voided | OrderStatus::Merged | OrderStatus::Cancelled
        )
    }
}

/// Line item status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Active,
    Voided,
    Comped,
}

/// Service type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeout,
}

/// What a line item represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    /// A real menu item
    #[default]
    Item,
    /// Synthetic claim on a share of the parent's balance (even / custom
    /// splits, shared-item shares)
    BalanceClaim,
}

// ============================================================================
// Seat assignment
// ============================================================================

/// Which guest-seat owns a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatAssignment {
    /// Owned by one seat (1..=total_seats)
    Seat { number: u32 },
    /// Shared across seats; an empty set means "all seats"
    Shared {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        seats: Vec<u32>,
    },
}

impl Default for SeatAssignment {
    fn default() -> Self {
        SeatAssignment::Shared { seats: Vec::new() }
    }
}

impl SeatAssignment {
    pub fn shared_all() -> Self {
        SeatAssignment::Shared { seats: Vec::new() }
    }

    pub fn seat(number: u32) -> Self {
        SeatAssignment::Seat { number }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, SeatAssignment::Shared { .. })
    }

    /// Seat number if singly owned
    pub fn seat_number(&self) -> Option<u32> {
        match self {
            SeatAssignment::Seat { number } => Some(*number),
            SeatAssignment::Shared { .. } => None,
        }
    }

    /// Whether this assignment touches the given seat
    pub fn involves(&self, seat: u32) -> bool {
        match self {
            SeatAssignment::Seat { number } => *number == seat,
            SeatAssignment::Shared { seats } => seats.is_empty() || seats.contains(&seat),
        }
    }
}

// ============================================================================
// Line items
// ============================================================================

/// A line item, owned by exactly one order at any instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: String,
    pub name: String,
    pub quantity: i32,
    /// Per-unit price in minor units
    pub unit_price: Money,
    /// Line tax in minor units (whole line, not per unit)
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub seat: SeatAssignment,
    /// For derived shares / claims: the item or order they were carved from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_item_id: Option<String>,
    /// Set when the kitchen ticket for this item was printed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_at: Option<i64>,
    /// Last add/modify timestamp (drives seat recency)
    pub added_at: i64,
}

impl OrderItem {
    pub fn is_active(&self) -> bool {
        self.status == ItemStatus::Active
    }

    /// Line total: unit price x quantity
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Input for adding an item to an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    #[serde(default)]
    pub tax: Money,
    #[serde(default)]
    pub seat: SeatAssignment,
}

// ============================================================================
// Payments
// ============================================================================

/// A recorded payment (authorization happened before the transaction)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub method: String,
    pub amount: Money,
    /// Processor authorization reference, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_ref: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    pub timestamp: i64,
}

// ============================================================================
// Split strategies
// ============================================================================

/// How to partition an order into child checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "strategy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitStrategy {
    /// N equal shares of the total, remainder to the lowest split indexes
    Even { ways: u32 },
    /// One child per populated seat; shared items divided across them
    BySeat,
    /// Move the named items to one new child
    ByItem { item_ids: Vec<String> },
    /// Carve a payment-only child for part of the outstanding balance
    CustomAmount { amount: Money },
}

// ============================================================================
// Order aggregate
// ============================================================================

/// The central aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    /// None for root orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_order_id: Option<String>,
    /// 1..N for children; drives the display label ("31-2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_index: Option<u32>,
    /// Short human check number, shared by a whole split tree
    pub check_number: u64,
    pub status: OrderStatus,

    /// Optimistic-lock counter for item/financial mutations
    pub version: u64,
    /// Independent counter for seat-shape mutations only
    pub seat_version: u64,

    /// Seats at open time
    pub base_seat_count: u32,
    /// Signed delta from seat inserts/removals since open
    pub extra_seat_count: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<String>,
    pub employee_id: String,
    #[serde(default)]
    pub order_type: OrderType,
    pub guest_count: u32,

    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentRecord>,

    // Money fields: the authoritative accounting for this order
    pub subtotal: Money,
    pub tax_total: Money,
    pub discount_total: Money,
    pub tip_total: Money,
    pub total: Money,

    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl Order {
    /// Create a fresh root order
    pub fn new_root(
        check_number: u64,
        table_id: Option<String>,
        employee_id: String,
        order_type: OrderType,
        guest_count: u32,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_order_id: None,
            split_index: None,
            check_number,
            status: OrderStatus::Open,
            version: 0,
            seat_version: 0,
            base_seat_count: guest_count,
            extra_seat_count: 0,
            table_id,
            employee_id,
            order_type,
            guest_count,
            items: Vec::new(),
            payments: Vec::new(),
            subtotal: Money::ZERO,
            tax_total: Money::ZERO,
            discount_total: Money::ZERO,
            tip_total: Money::ZERO,
            total: Money::ZERO,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// Create an empty child of this order with the given split index
    pub fn new_child(&self, split_index: u32) -> Self {
        let now = crate::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_order_id: Some(self.id.clone()),
            split_index: Some(split_index),
            check_number: self.check_number,
            status: OrderStatus::Open,
            version: 0,
            seat_version: 0,
            base_seat_count: self.total_seats(),
            extra_seat_count: 0,
            table_id: self.table_id.clone(),
            employee_id: self.employee_id.clone(),
            order_type: self.order_type,
            guest_count: self.guest_count,
            items: Vec::new(),
            payments: Vec::new(),
            subtotal: Money::ZERO,
            tax_total: Money::ZERO,
            discount_total: Money::ZERO,
            tip_total: Money::ZERO,
            total: Money::ZERO,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    /// Display label: "31" for a root, "31-2" for a child
    pub fn display_label(&self) -> String {
        match self.split_index {
            Some(idx) => format!("{}-{}", self.check_number, idx),
            None => self.check_number.to_string(),
        }
    }

    /// Current seat count (never below zero)
    pub fn total_seats(&self) -> u32 {
        (self.base_seat_count as i64 + self.extra_seat_count as i64).max(0) as u32
    }

    pub fn active_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|i| i.is_active())
    }

    pub fn has_active_items(&self) -> bool {
        self.items.iter().any(|i| i.is_active())
    }

    /// Sum of non-cancelled payments
    pub fn paid_amount(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| !p.cancelled)
            .map(|p| p.amount)
            .sum()
    }

    pub fn has_payments(&self) -> bool {
        self.payments.iter().any(|p| !p.cancelled)
    }

    /// Unpaid balance
    pub fn outstanding(&self) -> Money {
        self.total - self.paid_amount()
    }

    /// Recompute subtotal/tax from owned items, then the total identity.
    ///
    /// Called whenever item ownership changes (add, void, move, merge).
    /// Comped items keep their seat but contribute nothing.
    pub fn recalculate_from_items(&mut self) {
        self.subtotal = self.active_items().map(|i| i.line_total()).sum();
        self.tax_total = self.active_items().map(|i| i.tax).sum();
        self.recalculate_total();
    }

    /// Re-derive `total` from the component identity
    pub fn recalculate_total(&mut self) {
        self.total = self.subtotal + self.tax_total - self.discount_total + self.tip_total;
    }

    /// The invariant every committed mutation must leave true
    pub fn balances(&self) -> bool {
        self.total == self.subtotal + self.tax_total - self.discount_total + self.tip_total
    }

    /// Zero out all money components (the order became a pure shell)
    pub fn clear_balance(&mut self) {
        self.subtotal = Money::ZERO;
        self.tax_total = Money::ZERO;
        self.discount_total = Money::ZERO;
        self.tip_total = Money::ZERO;
        self.total = Money::ZERO;
    }
}

// ============================================================================
// Seat views (derived, recomputed on read)
// ============================================================================

/// Computed seat state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Empty,
    Active,
    Stale,
    Printed,
    Paid,
}

/// Per-seat aggregation of the items a seat owns. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_number: u32,
    pub subtotal: Money,
    pub total: Money,
    pub item_ids: Vec<String>,
    pub status: SeatStatus,
}
