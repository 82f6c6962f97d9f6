use clap::Parser;
use kvrelay::config::{Cli, Config};
use kvrelay::server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging (RUST_LOG, INFO by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from(Cli::parse());

    match &config.replica_of {
        Some(leader) => info!("kvrelay starting on port {} as follower of {}", config.port, leader),
        None => info!("kvrelay starting on port {} as leader", config.port),
    }

    if let Err(e) = server::run(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
