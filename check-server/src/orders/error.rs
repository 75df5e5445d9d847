//! Domain errors for order mutations
//!
//! Everything here is detected before or during the single write
//! transaction and aborts it wholesale; no partially applied mutation is
//! ever observable.

use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Domain-level failure of an order operation
#[derive(Debug, Error)]
pub enum OrderError {
    /// Stale expected version. The caller must re-fetch before retrying.
    #[error("Version conflict on order {order_id}: expected {expected}, current {current}")]
    Conflict {
        order_id: String,
        expected: u64,
        current: u64,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Child order {0} still has items or payments")]
    ChildNotEmpty(String),

    #[error("Split cap reached: {0} live children")]
    TooManySplits(usize),

    #[error("Seat position {position} out of range (1..={max})")]
    InvalidPosition { position: u32, max: u32 },

    #[error("By-seat split needs at least two populated seats, found {0}")]
    InsufficientSeats(usize),

    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Payment declined: {0}")]
    PaymentDeclined(String),
}

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Conflict { .. } => ErrorCode::Conflict,
            OrderError::Validation(_) => ErrorCode::ValidationError,
            OrderError::ChildNotEmpty(_) => ErrorCode::ChildNotEmpty,
            OrderError::TooManySplits(_) => ErrorCode::TooManySplits,
            OrderError::InvalidPosition { .. } => ErrorCode::InvalidPosition,
            OrderError::InsufficientSeats(_) => ErrorCode::InsufficientSeats,
            OrderError::NotFound(_) | OrderError::ItemNotFound(_) => ErrorCode::NotFound,
            OrderError::PaymentDeclined(_) => ErrorCode::PaymentDeclined,
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::new(err.code(), err.to_string())
    }
}
