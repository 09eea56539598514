//! Slam Duel peer - runs one side of a match from the terminal
//!
//! `PEER_ROLE=host` listens for a guest on `/ws`; `PEER_ROLE=guest` dials
//! `HOST_URL`. Shots and rematch answers are typed on stdin.

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slam_duel::app::{console, peer};
use slam_duel::config::Config;
use slam_duel::util::time::init_process_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    init_process_time();

    info!(role = %config.role, peer_id = %config.peer_id, "Starting Slam Duel peer");

    let (input_tx, input_rx) = mpsc::channel(64);
    tokio::spawn(console::run_console(input_tx));

    tokio::select! {
        exit = peer::run(config, input_rx) => {
            let exit = exit?;
            info!(?exit, "Match finished");
        }
        _ = shutdown_signal() => {}
    }

    info!("Peer shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
