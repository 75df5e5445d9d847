//! OrdersManager - lifecycle orchestration over the split tree
//!
//! Every mutating call is one redb write transaction:
//!
//! ```text
//! operation(args, expected_version)
//!     ├─ 1. Pre-transaction work (check number allocation, occupancy check)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Re-read order, compare expected version (abort with Conflict)
//!     ├─ 4. Compute (split plan / seat shift) on the in-memory aggregate
//!     ├─ 5. Apply, bump the version as the final write
//!     ├─ 6. Commit
//!     └─ 7. Broadcast change notifications (post-commit, never rolls back)
//! ```
//!
//! The split engine and seat ledger are pure functions over the aggregate;
//! nothing in this module holds state between calls besides the store and
//! the broadcast channel.

mod error;
pub use error::*;

use super::concurrency::{bump_version, check_seat_version, check_version};
use super::error::OrderError;
use super::ledger;
use super::split;
use super::storage::{OrderStore, StorageError};
use serde::Serialize;
use shared::money::{allocate_evenly, Money};
use shared::order::{
    ItemInput, ItemKind, ItemStatus, Order, OrderChangeKind, OrderChanged, OrderItem, OrderStatus,
    OrderType, PaymentRecord, SeatAssignment, SeatView, SplitStrategy, MAX_LIVE_CHILDREN,
};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::broadcast;

/// Notification channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// An item that changed owner during a mutation.
///
/// Exposed so callers can decide about kitchen reprints; this module never
/// routes tickets itself.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovedItem {
    pub item_id: String,
    pub to_order_id: String,
}

/// Result of a committed mutation
#[derive(Debug, Clone, Serialize)]
pub struct Mutated {
    pub order_id: String,
    pub version: u64,
    pub seat_version: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub moved_items: Vec<MovedItem>,
}

impl Mutated {
    fn of(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            version: order.version,
            seat_version: order.seat_version,
            moved_items: Vec::new(),
        }
    }

    fn with_moved(order: &Order, moved_items: Vec<MovedItem>) -> Self {
        Self {
            moved_items,
            ..Self::of(order)
        }
    }
}

/// A root order with its live children, sorted by split index
#[derive(Debug, Clone, Serialize)]
pub struct OrderGraph {
    pub root: Order,
    pub children: Vec<Order>,
}

/// Lifecycle manager over the order store
#[derive(Clone)]
pub struct OrdersManager {
    store: OrderStore,
    event_tx: broadcast::Sender<OrderChanged>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("store", &"<OrderStore>")
            .field("event_tx", &"<broadcast::Sender>")
            .finish()
    }
}

impl OrdersManager {
    /// Create a manager over the database at the given path
    pub fn new(db_path: impl AsRef<Path>) -> ManagerResult<Self> {
        let store = OrderStore::open(db_path)?;
        Ok(Self::with_store(store))
    }

    /// Create a manager over an already opened store
    pub fn with_store(store: OrderStore) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { store, event_tx }
    }

    /// Manager over an in-memory store (tests)
    pub fn open_in_memory() -> ManagerResult<Self> {
        Ok(Self::with_store(OrderStore::open_in_memory()?))
    }

    /// Subscribe to post-commit change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChanged> {
        self.event_tx.subscribe()
    }

    /// The underlying store
    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    // ========== Opening ==========

    /// Open a table (or a tab for takeout) as a fresh root order
    pub fn open_table(
        &self,
        table_id: Option<String>,
        employee_id: String,
        guest_count: u32,
        order_type: OrderType,
    ) -> ManagerResult<Mutated> {
        if guest_count == 0 {
            return Err(OrderError::Validation("Guest count must be at least 1".to_string()).into());
        }
        // Occupancy pre-check, before spending a check number
        if let Some(tid) = &table_id
            && let Some(existing) = self.store.find_order_for_table(tid)?
        {
            return Err(OrderError::Validation(format!(
                "Table {} is already occupied (order {})",
                tid, existing
            ))
            .into());
        }

        // Own transaction; redb does not nest write transactions
        let check_number = self.store.next_check_number()?;
        let order = Order::new_root(check_number, table_id, employee_id, order_type, guest_count);

        let txn = self.store.begin_write()?;
        self.store.put_order(&txn, &order)?;
        self.store.mark_active(&txn, &order.id)?;
        if let Some(tid) = &order.table_id {
            self.store.occupy_table(&txn, tid, &order.id)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order.id, check_number, "Table opened");
        self.publish(OrderChanged::new(OrderChangeKind::Opened, &order));
        Ok(Mutated::of(&order))
    }

    // ========== Items ==========

    /// Add items to an open order
    pub fn add_items(
        &self,
        order_id: &str,
        items: Vec<ItemInput>,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        if items.is_empty() {
            return Err(OrderError::Validation("No items to add".to_string()).into());
        }

        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        self.require_open(&order)?;
        check_version(&order, expected_version)?;

        let total_seats = order.total_seats();
        let now = shared::now_millis();
        for input in items {
            validate_seat(&input.seat, total_seats)?;
            if input.quantity <= 0 {
                return Err(
                    OrderError::Validation("Item quantity must be positive".to_string()).into(),
                );
            }
            if input.unit_price.is_negative() || input.tax.is_negative() {
                return Err(
                    OrderError::Validation("Item prices cannot be negative".to_string()).into(),
                );
            }
            order.items.push(OrderItem {
                id: uuid::Uuid::new_v4().to_string(),
                name: input.name,
                quantity: input.quantity,
                unit_price: input.unit_price,
                tax: input.tax,
                status: ItemStatus::Active,
                kind: ItemKind::Item,
                seat: input.seat,
                origin_item_id: None,
                printed_at: None,
                added_at: now,
            });
        }
        order.recalculate_from_items();
        bump_version(&mut order);
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        self.publish(OrderChanged::new(OrderChangeKind::ItemsChanged, &order));
        Ok(Mutated::of(&order))
    }

    /// Void one line item
    pub fn void_item(
        &self,
        order_id: &str,
        item_id: &str,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        self.set_item_status(order_id, item_id, ItemStatus::Voided, expected_version)
    }

    /// Comp one line item (keeps its seat, contributes nothing)
    pub fn comp_item(
        &self,
        order_id: &str,
        item_id: &str,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        self.set_item_status(order_id, item_id, ItemStatus::Comped, expected_version)
    }

    fn set_item_status(
        &self,
        order_id: &str,
        item_id: &str,
        status: ItemStatus,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        self.require_open(&order)?;
        check_version(&order, expected_version)?;

        let item = order
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| OrderError::ItemNotFound(item_id.to_string()))?;
        if item.status != ItemStatus::Active {
            return Err(OrderError::Validation(format!(
                "Item {} is not active (status {:?})",
                item_id, item.status
            ))
            .into());
        }
        item.status = status;
        order.recalculate_from_items();
        bump_version(&mut order);
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        self.publish(OrderChanged::new(OrderChangeKind::ItemsChanged, &order));
        Ok(Mutated::of(&order))
    }

    // ========== Splitting ==========

    /// Split an order under the given strategy.
    ///
    /// The plan is computed by the pure split engine and applied here inside
    /// one transaction; on any validation failure nothing is written.
    pub fn split(
        &self,
        order_id: &str,
        strategy: &SplitStrategy,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut source = self.load_order_txn(&txn, order_id)?;
        check_version(&source, expected_version)?;

        let live = self.store.children_txn(&txn, order_id)?;
        let next_index = next_split_index(&live);
        let plan = split::plan_split(&source, live.len(), next_index, strategy)?;

        let mut moved_items = Vec::new();
        let mut events = Vec::new();
        for child_plan in &plan.children {
            let mut child = source.new_child(child_plan.split_index);
            child.items = child_plan.items.clone();
            child.subtotal = child_plan.subtotal;
            child.tax_total = child_plan.tax_total;
            child.discount_total = child_plan.discount_total;
            child.tip_total = child_plan.tip_total;
            child.total = child_plan.total;
            self.store.put_order(&txn, &child)?;
            self.store.mark_active(&txn, &child.id)?;
            self.store.add_child(&txn, &source.id, &child.id)?;
            for item_id in &child_plan.moved_item_ids {
                moved_items.push(MovedItem {
                    item_id: item_id.clone(),
                    to_order_id: child.id.clone(),
                });
            }
            events.push(OrderChanged::new(OrderChangeKind::CheckCreated, &child));
        }

        if !plan.removed_item_ids.is_empty() {
            let removed: HashSet<&str> = plan.removed_item_ids.iter().map(String::as_str).collect();
            source.items.retain(|i| !removed.contains(i.id.as_str()));
        }
        source.status = plan.source_after.status;
        source.subtotal = plan.source_after.subtotal;
        source.tax_total = plan.source_after.tax_total;
        source.discount_total = plan.source_after.discount_total;
        source.tip_total = plan.source_after.tip_total;
        source.total = plan.source_after.total;
        bump_version(&mut source);
        self.store.put_order(&txn, &source)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %source.id,
            children = plan.children.len(),
            moved = moved_items.len(),
            "Order split committed"
        );
        events.insert(0, OrderChanged::new(OrderChangeKind::Split, &source));
        self.publish_all(events);
        Ok(Mutated::with_moved(&source, moved_items))
    }

    /// Add one check to a split tree.
    ///
    /// On an open, unsplit parent this transitions it to a split shell with
    /// an "everything" child holding all its items first, then the new empty
    /// check, so totals never double count. On an already-split parent it
    /// simply appends an empty check.
    pub fn create_check(&self, parent_id: &str, expected_version: u64) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut parent = self.load_order_txn(&txn, parent_id)?;
        if parent.parent_order_id.is_some() {
            return Err(OrderError::Validation(format!(
                "Order {} is a split check; split checks cannot be split again",
                parent.id
            ))
            .into());
        }
        check_version(&parent, expected_version)?;

        let live = self.store.children_txn(&txn, parent_id)?;
        let mut moved_items = Vec::new();
        let mut events = Vec::new();

        match parent.status {
            OrderStatus::Open if live.is_empty() => {
                if parent.has_payments() {
                    return Err(OrderError::Validation(
                        "Cannot split an order with recorded payments".to_string(),
                    )
                    .into());
                }
                if !parent.has_active_items() {
                    return Err(
                        OrderError::Validation("Cannot split an empty order".to_string()).into(),
                    );
                }

                // Everything child first
                let mut everything = parent.new_child(1);
                everything.items = std::mem::take(&mut parent.items);
                everything.subtotal = parent.subtotal;
                everything.tax_total = parent.tax_total;
                everything.discount_total = parent.discount_total;
                everything.tip_total = parent.tip_total;
                everything.total = parent.total;
                self.store.put_order(&txn, &everything)?;
                self.store.mark_active(&txn, &everything.id)?;
                self.store.add_child(&txn, &parent.id, &everything.id)?;
                for item in &everything.items {
                    moved_items.push(MovedItem {
                        item_id: item.id.clone(),
                        to_order_id: everything.id.clone(),
                    });
                }
                events.push(OrderChanged::new(OrderChangeKind::CheckCreated, &everything));

                // Then the new empty one
                let empty = parent.new_child(2);
                self.store.put_order(&txn, &empty)?;
                self.store.mark_active(&txn, &empty.id)?;
                self.store.add_child(&txn, &parent.id, &empty.id)?;
                events.push(OrderChanged::new(OrderChangeKind::CheckCreated, &empty));

                parent.status = OrderStatus::Split;
                parent.clear_balance();
            }
            OrderStatus::Split => {
                if live.len() + 1 > MAX_LIVE_CHILDREN {
                    return Err(OrderError::TooManySplits(live.len() + 1).into());
                }
                let child = parent.new_child(next_split_index(&live));
                self.store.put_order(&txn, &child)?;
                self.store.mark_active(&txn, &child.id)?;
                self.store.add_child(&txn, &parent.id, &child.id)?;
                events.push(OrderChanged::new(OrderChangeKind::CheckCreated, &child));
            }
            _ => {
                return Err(OrderError::Validation(format!(
                    "Order {} cannot take a new check (status {:?})",
                    parent.id, parent.status
                ))
                .into());
            }
        }

        bump_version(&mut parent);
        self.store.put_order(&txn, &parent)?;
        txn.commit().map_err(StorageError::from)?;

        self.publish_all(events);
        Ok(Mutated::with_moved(&parent, moved_items))
    }

    /// Delete a split check.
    ///
    /// Checks holding real active items or payments are protected by
    /// `ChildNotEmpty`; pure balance claims are deletable. Where the balance
    /// goes depends on what remains: with two or more surviving checks the
    /// parent stays an unpayable shell, so the deleted check's share spreads
    /// over the survivors; with one, the tree auto-merges (survivor folds
    /// into the parent, which reopens); with none, the balance folds back
    /// into the reopened parent directly. Either way no money is ever parked
    /// on a `Split` shell, so the shell can always close once its last live
    /// check pays.
    ///
    /// `expected_version` is the parent's version; the mutation reshapes the
    /// tree, so the parent is the aggregate being guarded.
    pub fn delete_check(&self, child_id: &str, expected_version: u64) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let child = self.load_order_txn(&txn, child_id)?;
        let parent_id = child.parent_order_id.clone().ok_or_else(|| {
            OrderError::Validation(format!("Order {} is not a split check", child_id))
        })?;
        let mut parent = self.load_order_txn(&txn, &parent_id)?;
        check_version(&parent, expected_version)?;

        let has_real_items = child
            .items
            .iter()
            .any(|i| i.is_active() && i.kind == ItemKind::Item);
        if has_real_items || child.has_payments() {
            return Err(OrderError::ChildNotEmpty(child_id.to_string()).into());
        }

        let mut events = vec![OrderChanged::new(OrderChangeKind::CheckDeleted, &child)];
        let mut moved_items = Vec::new();

        self.store.delete_order(&txn, &child.id)?;
        self.store.remove_child(&txn, &parent_id, &child.id)?;

        let remaining = self.store.children_txn(&txn, &parent_id)?;
        match remaining.len() {
            1 => {
                fold_child_into(&mut parent, child);
                // Auto-merge: fold the survivor back, parent reopens
                let survivor = remaining.into_iter().next().expect("len checked");
                for item in survivor.items.iter().filter(|i| i.kind == ItemKind::Item) {
                    moved_items.push(MovedItem {
                        item_id: item.id.clone(),
                        to_order_id: parent.id.clone(),
                    });
                }
                fold_child_into(&mut parent, survivor.clone());
                self.store.delete_order(&txn, &survivor.id)?;
                self.store.remove_child(&txn, &parent_id, &survivor.id)?;
                parent.status = OrderStatus::Open;
                tracing::info!(order_id = %parent.id, "Split tree collapsed, parent reopened");
            }
            0 => {
                fold_child_into(&mut parent, child);
                parent.status = OrderStatus::Open;
            }
            _ => {
                let reallocated =
                    self.reallocate_check_balance(&txn, &mut parent, child, remaining)?;
                events.extend(reallocated);
            }
        }

        bump_version(&mut parent);
        self.store.put_order(&txn, &parent)?;
        txn.commit().map_err(StorageError::from)?;

        if parent.status == OrderStatus::Open {
            events.push(OrderChanged::new(OrderChangeKind::Merged, &parent));
        }
        self.publish_all(events);
        Ok(Mutated::with_moved(&parent, moved_items))
    }

    /// Fold every live check back into the parent; the parent reopens
    pub fn merge_all(&self, parent_id: &str, expected_version: u64) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut parent = self.load_order_txn(&txn, parent_id)?;
        check_version(&parent, expected_version)?;

        let children = self.store.children_txn(&txn, parent_id)?;
        if children.is_empty() {
            return Err(OrderError::Validation(format!(
                "Order {} has no split checks to merge",
                parent_id
            ))
            .into());
        }

        let mut moved_items = Vec::new();
        for child in children {
            for item in child.items.iter().filter(|i| i.kind == ItemKind::Item) {
                moved_items.push(MovedItem {
                    item_id: item.id.clone(),
                    to_order_id: parent.id.clone(),
                });
            }
            self.store.delete_order(&txn, &child.id)?;
            self.store.remove_child(&txn, &parent_id, &child.id)?;
            fold_child_into(&mut parent, child);
        }
        parent.status = OrderStatus::Open;
        bump_version(&mut parent);
        self.store.put_order(&txn, &parent)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %parent.id, "All checks merged back");
        self.publish(OrderChanged::new(OrderChangeKind::Merged, &parent));
        Ok(Mutated::with_moved(&parent, moved_items))
    }

    /// Merge one order into another.
    ///
    /// Active items and discounts transfer to the target; the source keeps
    /// its payment history as a terminal `Merged` shell, or is destroyed
    /// outright when it never saw a payment. `expected_version` guards the
    /// target, which is the order whose totals change.
    pub fn merge(
        &self,
        source_id: &str,
        target_id: &str,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        if source_id == target_id {
            return Err(
                OrderError::Validation("Cannot merge an order into itself".to_string()).into(),
            );
        }

        let txn = self.store.begin_write()?;
        let mut source = self.load_order_txn(&txn, source_id)?;
        let mut target = self.load_order_txn(&txn, target_id)?;
        self.require_open(&source)?;
        self.require_open(&target)?;
        check_version(&target, expected_version)?;

        let mut moved_items = Vec::new();
        let mut kept = Vec::new();
        for item in std::mem::take(&mut source.items) {
            if item.is_active() {
                moved_items.push(MovedItem {
                    item_id: item.id.clone(),
                    to_order_id: target.id.clone(),
                });
                target.items.push(item);
            } else {
                kept.push(item);
            }
        }
        source.items = kept;
        target.discount_total += source.discount_total;
        target.tip_total += source.tip_total;
        target.recalculate_from_items();

        if let Some(pid) = &source.parent_order_id {
            self.store.remove_child(&txn, pid, &source.id)?;
        } else if let Some(tid) = &source.table_id {
            self.store.free_table(&txn, tid)?;
        }

        let source_event = if source.has_payments() {
            source.status = OrderStatus::Merged;
            source.clear_balance();
            source.closed_at = Some(shared::now_millis());
            bump_version(&mut source);
            self.store.put_order(&txn, &source)?;
            self.store.mark_inactive(&txn, &source.id)?;
            Some(OrderChanged::new(OrderChangeKind::Merged, &source))
        } else {
            self.store.delete_order(&txn, &source.id)?;
            None
        };

        bump_version(&mut target);
        self.store.put_order(&txn, &target)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(source_id, target_id, moved = moved_items.len(), "Orders merged");
        if let Some(event) = source_event {
            self.publish(event);
        }
        self.publish(OrderChanged::new(OrderChangeKind::Merged, &target));
        Ok(Mutated::with_moved(&target, moved_items))
    }

    // ========== Seats ==========

    /// Insert a seat at `position`, shifting existing seats up
    pub fn insert_seat(
        &self,
        order_id: &str,
        position: u32,
        expected_seat_version: u64,
    ) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        self.require_open(&order)?;
        check_seat_version(&order, expected_seat_version)?;

        ledger::insert_seat(&mut order, position)?;
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        self.publish(OrderChanged::new(OrderChangeKind::SeatsChanged, &order));
        Ok(Mutated::of(&order))
    }

    /// Remove the seat at `position`; its items move to the shared pool
    pub fn remove_seat(
        &self,
        order_id: &str,
        position: u32,
        expected_seat_version: u64,
    ) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        self.require_open(&order)?;
        check_seat_version(&order, expected_seat_version)?;

        let shift = ledger::remove_seat(&mut order, position)?;
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        // Orphaned items stayed on this order, but their seat changed; the
        // caller may want to reprint
        let moved_items = shift
            .items_moved_to_shared
            .into_iter()
            .map(|item_id| MovedItem {
                item_id,
                to_order_id: order.id.clone(),
            })
            .collect();
        self.publish(OrderChanged::new(OrderChangeKind::SeatsChanged, &order));
        Ok(Mutated::with_moved(&order, moved_items))
    }

    // ========== Payments ==========

    /// Record a payment that was authorized before this call.
    ///
    /// The order flips to Paid when fully covered; a split parent whose last
    /// live check just paid closes with it.
    pub fn record_payment(
        &self,
        order_id: &str,
        amount: Money,
        method: String,
        auth_ref: Option<String>,
        expected_version: u64,
    ) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        self.require_open(&order)?;
        check_version(&order, expected_version)?;

        if amount <= Money::ZERO {
            return Err(
                OrderError::Validation("Payment amount must be positive".to_string()).into(),
            );
        }
        let outstanding = order.outstanding();
        if amount > outstanding {
            return Err(OrderError::Validation(format!(
                "Payment {} exceeds outstanding balance {}",
                amount, outstanding
            ))
            .into());
        }

        let now = shared::now_millis();
        order.payments.push(PaymentRecord {
            payment_id: uuid::Uuid::new_v4().to_string(),
            method,
            amount,
            auth_ref,
            cancelled: false,
            timestamp: now,
        });

        let mut events = Vec::new();
        if order.outstanding().is_zero() {
            order.status = OrderStatus::Paid;
            order.closed_at = Some(now);
            self.store.mark_inactive(&txn, &order.id)?;

            if let Some(parent_id) = order.parent_order_id.clone() {
                self.store.remove_child(&txn, &parent_id, &order.id)?;
                // Last live check paid: the split parent closes with it
                if self.store.child_ids_txn(&txn, &parent_id)?.is_empty() {
                    let mut parent = self.load_order_txn(&txn, &parent_id)?;
                    if parent.status == OrderStatus::Split {
                        parent.status = OrderStatus::Paid;
                        parent.closed_at = Some(now);
                        bump_version(&mut parent);
                        self.store.put_order(&txn, &parent)?;
                        self.store.mark_inactive(&txn, &parent.id)?;
                        if let Some(tid) = &parent.table_id {
                            self.store.free_table(&txn, tid)?;
                        }
                        events.push(OrderChanged::new(OrderChangeKind::Paid, &parent));
                    }
                }
            } else if let Some(tid) = &order.table_id {
                self.store.free_table(&txn, tid)?;
            }
        }

        bump_version(&mut order);
        self.store.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order.id, amount = %amount, status = ?order.status, "Payment recorded");
        events.insert(0, OrderChanged::new(OrderChangeKind::PaymentRecorded, &order));
        if order.status == OrderStatus::Paid {
            events.push(OrderChanged::new(OrderChangeKind::Paid, &order));
        }
        self.publish_all(events);
        Ok(Mutated::of(&order))
    }

    /// Void an order before any financial activity
    pub fn void_order(&self, order_id: &str, expected_version: u64) -> ManagerResult<Mutated> {
        let txn = self.store.begin_write()?;
        let mut order = self.load_order_txn(&txn, order_id)?;
        if order.status.is_terminal() {
            return Err(OrderError::Validation(format!(
                "Order {} is already closed (status {:?})",
                order_id, order.status
            ))
            .into());
        }
        if order.parent_order_id.is_some() {
            return Err(OrderError::Validation(
                "Split checks are removed via delete, not void".to_string(),
            )
            .into());
        }
        if !self.store.child_ids_txn(&txn, order_id)?.is_empty() {
            return Err(OrderError::Validation(format!(
                "Order {} still has live split checks",
                order_id
            ))
            .into());
        }
        if order.has_payments() {
            return Err(OrderError::Validation(
                "Cancel recorded payments before voiding".to_string(),
            )
            .into());
        }
        check_version(&order, expected_version)?;

        order.status = OrderStatus::Voided;
        order.closed_at = Some(shared::now_millis());
        bump_version(&mut order);
        self.store.put_order(&txn, &order)?;
        self.store.mark_inactive(&txn, &order.id)?;
        if let Some(tid) = &order.table_id {
            self.store.free_table(&txn, tid)?;
        }
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order.id, "Order voided");
        self.publish(OrderChanged::new(OrderChangeKind::Voided, &order));
        Ok(Mutated::of(&order))
    }

    // ========== Queries ==========

    /// Load one order
    pub fn get_order(&self, order_id: &str) -> ManagerResult<Order> {
        Ok(self
            .store
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?)
    }

    /// The split tree an order belongs to: its root plus live children
    pub fn order_graph(&self, order_id: &str) -> ManagerResult<OrderGraph> {
        let order = self.get_order(order_id)?;
        let root = match &order.parent_order_id {
            Some(pid) => self.get_order(pid)?,
            None => order,
        };
        let children = self.store.children(&root.id)?;
        Ok(OrderGraph { root, children })
    }

    /// Derived per-seat views of an order (recomputed on read)
    pub fn seat_views(&self, order_id: &str) -> ManagerResult<Vec<SeatView>> {
        let order = self.get_order(order_id)?;
        Ok(ledger::seat_views(&order, shared::now_millis()))
    }

    /// All live orders
    pub fn active_orders(&self) -> ManagerResult<Vec<Order>> {
        let mut orders = Vec::new();
        for id in self.store.get_active_order_ids()? {
            if let Some(order) = self.store.get_order(&id)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    // ========== Internals ==========

    /// Spread a deleted check's balance over the surviving checks.
    ///
    /// Componentwise largest-remainder allocation, extra minor units to the
    /// lowest split indexes, the same rule the even split uses. Each survivor
    /// gains one balance claim carrying its share, so its item sums keep
    /// matching its subtotal. The deleted check's active claims dissolve into
    /// those shares; its inactive items transfer to the parent as history and
    /// carry no money.
    fn reallocate_check_balance(
        &self,
        txn: &redb::WriteTransaction,
        parent: &mut Order,
        child: Order,
        mut survivors: Vec<Order>,
    ) -> ManagerResult<Vec<OrderChanged>> {
        let n = survivors.len();
        let subs = allocate_evenly(child.subtotal, n);
        let taxes = allocate_evenly(child.tax_total, n);
        let discounts = allocate_evenly(child.discount_total, n);
        let tips = allocate_evenly(child.tip_total, n);

        let now = shared::now_millis();
        let mut events = Vec::new();
        for (i, sibling) in survivors.iter_mut().enumerate() {
            if subs[i].is_zero()
                && taxes[i].is_zero()
                && discounts[i].is_zero()
                && tips[i].is_zero()
            {
                continue;
            }
            if !subs[i].is_zero() || !taxes[i].is_zero() {
                sibling.items.push(OrderItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: format!("Reallocated from check {}", child.display_label()),
                    quantity: 1,
                    unit_price: subs[i],
                    tax: taxes[i],
                    status: ItemStatus::Active,
                    kind: ItemKind::BalanceClaim,
                    seat: SeatAssignment::shared_all(),
                    origin_item_id: Some(parent.id.clone()),
                    printed_at: None,
                    added_at: now,
                });
            }
            sibling.subtotal += subs[i];
            sibling.tax_total += taxes[i];
            sibling.discount_total += discounts[i];
            sibling.tip_total += tips[i];
            sibling.recalculate_total();
            bump_version(sibling);
            self.store.put_order(txn, sibling)?;
            events.push(OrderChanged::new(OrderChangeKind::ItemsChanged, sibling));
        }

        let parent_id = parent.id.clone();
        for item in child.items {
            let claim_on_parent = item.kind == ItemKind::BalanceClaim
                && item.origin_item_id.as_deref() == Some(parent_id.as_str());
            if !item.is_active() && !claim_on_parent {
                parent.items.push(item);
            }
        }
        Ok(events)
    }

    fn load_order_txn(
        &self,
        txn: &redb::WriteTransaction,
        order_id: &str,
    ) -> ManagerResult<Order> {
        Ok(self
            .store
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?)
    }

    fn require_open(&self, order: &Order) -> Result<(), OrderError> {
        if order.status != OrderStatus::Open {
            return Err(OrderError::Validation(format!(
                "Order {} is not open (status {:?})",
                order.id, order.status
            )));
        }
        Ok(())
    }

    fn publish(&self, event: OrderChanged) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Change notification dropped: no active subscribers");
        }
    }

    fn publish_all(&self, events: Vec<OrderChanged>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Next free split index: one past the highest live index, never reusing a
/// lower hole so labels like "31-2" stay stable for their lifetime
fn next_split_index(live: &[Order]) -> u32 {
    live.iter().filter_map(|c| c.split_index).max().unwrap_or(0) + 1
}

/// Fold a check back into its parent.
///
/// Real items and derived shares transfer back as items; claims carved
/// directly against the parent dissolve, since the items backing them never
/// left the parent. Money components add back exactly, so the identity and
/// the tree-wide balance both survive the fold.
fn fold_child_into(parent: &mut Order, child: Order) {
    let parent_id = parent.id.clone();
    for item in child.items {
        let claim_on_parent = item.kind == ItemKind::BalanceClaim
            && item.origin_item_id.as_deref() == Some(parent_id.as_str());
        if !claim_on_parent {
            parent.items.push(item);
        }
    }
    parent.payments.extend(child.payments);
    parent.subtotal += child.subtotal;
    parent.tax_total += child.tax_total;
    parent.discount_total += child.discount_total;
    parent.tip_total += child.tip_total;
    parent.recalculate_total();
}

/// Seat references on incoming items must exist on the order
fn validate_seat(seat: &SeatAssignment, total_seats: u32) -> Result<(), OrderError> {
    match seat {
        SeatAssignment::Seat { number } => {
            if *number < 1 || *number > total_seats {
                return Err(OrderError::Validation(format!(
                    "Seat {} does not exist (order has {} seats)",
                    number, total_seats
                )));
            }
        }
        SeatAssignment::Shared { seats } => {
            for number in seats {
                if *number < 1 || *number > total_seats {
                    return Err(OrderError::Validation(format!(
                        "Seat {} does not exist (order has {} seats)",
                        number, total_seats
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
