mod config;
mod format;
mod matrix;
mod server;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,matrix_relay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; required variables abort before the listener binds
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully");
    info!("  User: {}", config.user);
    info!("  Homeserver: {}", config.homeserver);
    info!("  Room: {}", config.room_id);

    let state = Arc::new(AppState::new(config));

    info!("Relay is starting...");
    server::run(state).await?;

    Ok(())
}
