use std::sync::Arc;

use crate::core::Config;
use crate::orders::manager::OrdersManager;
use crate::payments::{AutoApprove, PaymentProcessor};

/// Shared server state: cheap to clone, handed to every handler
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub orders: Arc<OrdersManager>,
    pub payments: Arc<dyn PaymentProcessor>,
}

impl ServerState {
    /// Open the store under the configured work dir
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let orders = OrdersManager::new(config.db_path())?;
        tracing::info!(db = %config.db_path().display(), "Order store opened");
        Ok(Self {
            config: Arc::new(config.clone()),
            orders: Arc::new(orders),
            payments: Arc::new(AutoApprove),
        })
    }

    /// State over an existing manager (tests)
    pub fn with_manager(config: Config, orders: OrdersManager) -> Self {
        Self {
            config: Arc::new(config),
            orders: Arc::new(orders),
            payments: Arc::new(AutoApprove),
        }
    }
}
