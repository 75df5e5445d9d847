use check_server::{Config, Server, setup_environment};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    setup_environment(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.http_port,
        "Starting check server"
    );

    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server exited with error: {e:#}");
        std::process::exit(1);
    }
}
