//! api-relay server binary.
//!
//! Reads its configuration from the environment and serves until interrupted.

use api_relay::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Starting api-relay on {} (production: {}, session cookie: {})",
        config.bind_addr(),
        config.production,
        config.session.cookie_name
    );

    let server = RelayServer::new(config)?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    }
}
