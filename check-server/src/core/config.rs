/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Purpose |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/check-server | Database and log directory |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | LOG_LEVEL | info | Log filter level |
/// | REQUEST_TIMEOUT_MS | 30000 | Per-request timeout |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for the database file and logs
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Log level: trace | debug | info | warn | error
    pub log_level: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/check-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30_000),
        }
    }

    /// Path of the order database file
    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("orders.redb")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
