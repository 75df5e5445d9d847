//! Order lifecycle: storage, splitting, seats, payments
//!
//! Layering, bottom up:
//!
//! - [`storage`]  — redb-backed [`OrderStore`]: orders as JSON rows plus the
//!   active-order, children and table-occupancy indexes
//! - [`concurrency`] — the two optimistic-lock counters and their checks
//! - [`split`]    — pure planning for the four split strategies; no I/O
//! - [`ledger`]   — positional seat arithmetic and derived per-seat views
//! - [`manager`]  — [`OrdersManager`]: one write transaction per mutation,
//!   post-commit change notifications over a broadcast channel
//!
//! Everything above the store goes through the manager; handlers never
//! touch redb directly.

pub mod concurrency;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod split;
pub mod storage;

pub use error::OrderError;
pub use manager::{ManagerError, ManagerResult, MovedItem, Mutated, OrderGraph, OrdersManager};
pub use storage::{OrderStore, StorageError};

// The aggregate types live in `shared` so other binaries can speak the
// same wire format; re-export the common ones for crate-local use.
pub use shared::order::{
    Order, OrderChanged, OrderItem, OrderStatus, OrderType, PaymentRecord, SeatAssignment,
    SeatView, SplitStrategy,
};
