//! Shared utilities: error responses and logging

pub mod error;
pub mod logger;

pub use error::{AppError, AppResult};
pub use logger::{init_logger, init_logger_with_file};
