//! Wire-level error taxonomy
//!
//! Every failure a client can act on is expressed as one of these codes.
//! The split is deliberate:
//!
//! | Code | Recovery |
//! |------|----------|
//! | `CONFLICT` | re-fetch the order, recompute, resubmit |
//! | `VALIDATION_ERROR` | terminal for the request; show the operator |
//! | `CHILD_NOT_EMPTY` | terminal; child must be emptied first |
//! | `TOO_MANY_SPLITS` | terminal; hard cap of live children reached |
//! | `INVALID_POSITION` | terminal; seat index out of range |
//! | `INSUFFICIENT_SEATS` | terminal; by-seat split needs >= 2 populated seats |
//! | `NOT_FOUND` | terminal |
//! | `PAYMENT_DECLINED` | terminal; processor declined before the txn |
//! | `INTERNAL_ERROR` | retry later / report |

use serde::{Deserialize, Serialize};

/// Machine-readable error code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Stale `expected_version` / `expected_seat_version`
    Conflict,
    /// Bad strategy parameters or illegal state transition
    ValidationError,
    /// Delete-check rejected: child still owns items or payments
    ChildNotEmpty,
    /// Live-children cap exceeded
    TooManySplits,
    /// Seat position outside 1..=total (+1 for insert)
    InvalidPosition,
    /// By-seat split with fewer than two populated seats
    InsufficientSeats,
    NotFound,
    PaymentDeclined,
    InternalError,
}

/// Error body returned by the API and carried in command responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
