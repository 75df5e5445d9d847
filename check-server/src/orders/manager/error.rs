//! Manager-level error type

use crate::orders::error::OrderError;
use crate::orders::storage::StorageError;
use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ManagerResult<T> = Result<T, ManagerError>;

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Order(e) => e.into(),
            ManagerError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                ApiError::new(ErrorCode::InternalError, "Internal storage error".to_string())
            }
        }
    }
}
