//! HTTP-facing error handling
//!
//! Every domain failure maps to one wire-level `ErrorCode` and one status:
//!
//! | Code | Status |
//! |------|--------|
//! | `CONFLICT` | 409 |
//! | `VALIDATION_ERROR`, `INVALID_POSITION` | 400 |
//! | `CHILD_NOT_EMPTY`, `TOO_MANY_SPLITS`, `INSUFFICIENT_SEATS` | 422 |
//! | `NOT_FOUND` | 404 |
//! | `PAYMENT_DECLINED` | 402 |
//! | `INTERNAL_ERROR` | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::error::{ApiError, ErrorCode};

/// Application error carried through handlers
#[derive(Debug)]
pub struct AppError(pub ApiError);

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self.0.code {
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::ValidationError | ErrorCode::InvalidPosition => StatusCode::BAD_REQUEST,
            ErrorCode::ChildNotEmpty
            | ErrorCode::TooManySplits
            | ErrorCode::InsufficientSeats => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.0.code, message = %self.0.message, "Request failed");
        } else {
            tracing::debug!(code = ?self.0.code, message = %self.0.message, "Request rejected");
        }
        (status, Json(self.0)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}
