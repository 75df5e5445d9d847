//! redb-based order store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | JSON `Order` | Order rows (items + payments embedded) |
//! | `active_orders` | `order_id` | `()` | Live order index |
//! | `children` | `(parent_id, child_id)` | `()` | Live-children index per parent |
//! | `tables` | `table_id` | `order_id` | Table occupancy |
//! | `counters` | `"check_number"` | `u64` | Check number sequence |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: the database file is always
//! in a consistent state, which is what lets the manager treat one write
//! transaction as the atomicity boundary for a whole split.
//!
//! Terminals never share in-process state; every terminal's request is
//! serialized by the store's single-writer transaction, and staleness is
//! detected by the version fields on the order rows themselves.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::Order;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Order rows: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Live orders (open or split): key = order_id
const ACTIVE_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_orders");

/// Live-children index: key = (parent_id, child_id)
const CHILDREN_TABLE: TableDefinition<(&str, &str), ()> = TableDefinition::new("children");

/// Table occupancy: key = table_id, value = order_id
const TABLES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tables");

/// Counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const CHECK_NUMBER_KEY: &str = "check_number";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order store backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(ORDERS_TABLE)?;
            let _ = txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = txn.open_table(CHILDREN_TABLE)?;
            let _ = txn.open_table(TABLES_TABLE)?;
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            if counters.get(CHECK_NUMBER_KEY)?.is_none() {
                counters.insert(CHECK_NUMBER_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Check number counter ==========

    /// Allocate the next check number.
    ///
    /// Runs in its own transaction, so callers must invoke it BEFORE opening
    /// the mutation transaction (redb does not nest write transactions).
    pub fn next_check_number(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let current = counters.get(CHECK_NUMBER_KEY)?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            counters.insert(CHECK_NUMBER_KEY, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Order rows ==========

    /// Write (insert or replace) an order row within a transaction
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Read an order within a write transaction (sees uncommitted writes)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read an order outside any transaction
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an order row entirely (destroyed children, dissolved merges)
    pub fn delete_order(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.remove(order_id)?;
        let mut active = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        active.remove(order_id)?;
        Ok(())
    }

    // ========== Active index ==========

    pub fn mark_active(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.insert(order_id, ())?;
        Ok(())
    }

    pub fn mark_inactive(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    pub fn get_active_order_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, _) = result?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    // ========== Children index ==========

    pub fn add_child(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
        child_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CHILDREN_TABLE)?;
        table.insert((parent_id, child_id), ())?;
        Ok(())
    }

    pub fn remove_child(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
        child_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(CHILDREN_TABLE)?;
        table.remove((parent_id, child_id))?;
        Ok(())
    }

    /// Live child ids of a parent, within a write transaction
    pub fn child_ids_txn(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
    ) -> StorageResult<Vec<String>> {
        let table = txn.open_table(CHILDREN_TABLE)?;
        let mut ids = Vec::new();
        let range_start = (parent_id, "");
        let range_end = (parent_id, "\u{10FFFF}");
        for result in table.range(range_start..=range_end)? {
            let (key, _) = result?;
            ids.push(key.value().1.to_string());
        }
        Ok(ids)
    }

    /// Live child ids of a parent, read-only
    pub fn child_ids(&self, parent_id: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHILDREN_TABLE)?;
        let mut ids = Vec::new();
        let range_start = (parent_id, "");
        let range_end = (parent_id, "\u{10FFFF}");
        for result in table.range(range_start..=range_end)? {
            let (key, _) = result?;
            ids.push(key.value().1.to_string());
        }
        Ok(ids)
    }

    /// Live children of a parent, sorted by split index, within a txn
    pub fn children_txn(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
    ) -> StorageResult<Vec<Order>> {
        let mut children = Vec::new();
        for id in self.child_ids_txn(txn, parent_id)? {
            if let Some(order) = self.get_order_txn(txn, &id)? {
                children.push(order);
            }
        }
        children.sort_by_key(|c| c.split_index);
        Ok(children)
    }

    /// Live children of a parent, sorted by split index, read-only
    pub fn children(&self, parent_id: &str) -> StorageResult<Vec<Order>> {
        let mut children = Vec::new();
        for id in self.child_ids(parent_id)? {
            if let Some(order) = self.get_order(&id)? {
                children.push(order);
            }
        }
        children.sort_by_key(|c| c.split_index);
        Ok(children)
    }

    // ========== Table occupancy ==========

    pub fn occupy_table(
        &self,
        txn: &WriteTransaction,
        table_id: &str,
        order_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(TABLES_TABLE)?;
        table.insert(table_id, order_id)?;
        Ok(())
    }

    pub fn free_table(&self, txn: &WriteTransaction, table_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(TABLES_TABLE)?;
        table.remove(table_id)?;
        Ok(())
    }

    /// Order currently holding a table, if any
    pub fn find_order_for_table(&self, table_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLES_TABLE)?;
        Ok(table.get(table_id)?.map(|g| g.value().to_string()))
    }
}
