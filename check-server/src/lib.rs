//! check-server - restaurant check splitting and seat assignment engine
//!
//! ```text
//! check-server/
//! ├── api/        HTTP routes and handlers (axum)
//! ├── core/       configuration, state, server startup
//! ├── orders/     order store, split engine, seat ledger, lifecycle manager
//! ├── payments/   payment processor seam (authorize / capture / void)
//! └── utils/      error-to-response mapping, logging
//! ```

pub mod api;
pub mod core;
pub mod orders;
pub mod payments;
pub mod utils;

pub use crate::core::{Config, Server, ServerState};
pub use orders::OrdersManager;
pub use utils::{AppError, AppResult, init_logger, init_logger_with_file};

/// Load .env, create the work dir, start logging
pub fn setup_environment(config: &Config) {
    if let Err(e) = std::fs::create_dir_all(&config.work_dir) {
        eprintln!("Failed to create work dir {}: {}", config.work_dir, e);
    }
    init_logger_with_file(Some(&config.log_level), Some(&config.work_dir));
}
