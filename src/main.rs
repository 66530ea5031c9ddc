/// Authn Core - account lifecycle and session token service
///
/// Provisions accounts, manages their archive/delete lifecycle, and issues
/// session and identity tokens backed by an expiring refresh token store.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod health;
mod metrics;
mod password;
mod server;
mod token;

use anyhow::Context;
use config::ServerConfig;
use context::AppContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env().context("failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "authn_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting authn core");

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("failed to initialize application context")?;

    // Start server
    server::serve(ctx).await.context("server terminated")?;

    Ok(())
}
