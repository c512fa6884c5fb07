//! # merkle-demo: Binary Entry Point
//!
//! Starts the Axum HTTP server for the Merkle proof demonstration.

use clap::Parser;
use merkle_demo::api::{self, AppState};
use merkle_demo::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.socket_addr();
    tracing::info!(
        max_records = config.max_records,
        odd_policy = %config.odd_policy,
        "configuration loaded"
    );

    let app = api::app(AppState::new(config));

    tracing::info!("merkle-demo listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
