//! drs-notify server
//!
//! Receives SNS deliveries for Dash Replenishment notifications and logs them.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use drs_notify::error::ServerError;
use drs_notify::handlers::{app_router, NotifyState};
use drs_notify::sns::Handlers;
use drs_notify::NotifyConfig;

/// Dash Replenishment notification server
#[derive(Parser, Debug)]
#[command(name = "drs-notify")]
#[command(version)]
#[command(about = "Receive and dispatch Dash Replenishment SNS notifications")]
struct Args {
    /// Address to listen on (overrides DRS_NOTIFY_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = NotifyConfig::from_env().context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let state = Arc::new(NotifyState::from_config(&config, Handlers::logging())?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| ServerError::BindFailed {
            addr: config.bind_addr.to_string(),
            message: e.to_string(),
        })?;

    tracing::info!("drs-notify {} listening on {}", drs_notify::VERSION, config.bind_addr);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Stopped(e.to_string()))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
