//! Shared types for the check-splitting engine
//!
//! Common types used by the server and by any client that talks to it:
//! the order aggregate, split strategies, the money representation, the
//! error taxonomy, and change notifications.

pub mod error;
pub mod money;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiError, ErrorCode};
pub use money::Money;
pub use order::{
    Order, OrderChanged, OrderChangeKind, OrderItem, OrderStatus, OrderType, SeatAssignment,
    SeatStatus, SeatView, SplitStrategy,
};

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
