//! Wiring of one peer process: transport, controller and loop

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::config::Config;
use crate::game::arena::Arena;
use crate::game::{LocalAction, LogObserver, MatchController, MatchRunner, MatchSetup, Role, RunExit};
use crate::http::build_router;
use crate::ws::client;
use crate::ws::protocol::PlayerId;
use crate::ws::PEER_CHANNEL_CAPACITY;

use super::state::{AppState, PeerLink};

/// Run this process as host or guest, per the configured role
pub async fn run(config: Config, input_rx: mpsc::Receiver<LocalAction>) -> anyhow::Result<RunExit> {
    let config = Arc::new(config);
    match config.role {
        Role::Host => run_host(config, input_rx).await,
        Role::Guest => run_guest(config, input_rx).await,
    }
}

async fn run_host(config: Arc<Config>, input_rx: mpsc::Receiver<LocalAction>) -> anyhow::Result<RunExit> {
    let (inbound_tx, inbound_rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
    let (hello_tx, hello_rx) = oneshot::channel();

    let state = AppState::new(
        config.clone(),
        PeerLink {
            inbound_tx,
            outbound_rx,
            hello_tx,
        },
    );
    let router = build_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("Host listening on {}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);
    info!("WebSocket endpoint: ws://{}/ws", config.listen_addr);

    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "HTTP server stopped");
        }
    });

    let guest = hello_rx
        .await
        .context("guest connection dropped before the handshake")?;
    let controller = build_controller(&config, config.peer_id.clone(), guest)?;
    let exit = MatchRunner::new(controller, inbound_rx, outbound_tx, input_rx)
        .run()
        .await;

    server.abort();
    Ok(exit)
}

async fn run_guest(config: Arc<Config>, input_rx: mpsc::Receiver<LocalAction>) -> anyhow::Result<RunExit> {
    let url = config
        .host_url
        .as_deref()
        .context("HOST_URL is required for a guest")?;
    let link = client::connect(url, &config.peer_id).await?;

    let controller = build_controller(&config, link.host, config.peer_id.clone())?;
    Ok(MatchRunner::new(controller, link.inbound_rx, link.outbound_tx, input_rx)
        .run()
        .await)
}

fn build_controller(config: &Config, host: PlayerId, guest: PlayerId) -> anyhow::Result<MatchController> {
    let seed = config.match_seed.unwrap_or_else(rand::random);
    let mut controller = MatchController::new(MatchSetup {
        role: config.role,
        host,
        guest,
        arena: Arena::default(),
        win_threshold: config.win_threshold,
        seed,
    })?;
    controller.subscribe(Box::new(LogObserver));
    Ok(controller)
}
