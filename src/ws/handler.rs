//! WebSocket upgrade handler for the host's single guest

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::{AppState, PeerLink};
use crate::util::rate_limit::PeerRateLimiter;
use crate::ws::protocol::{Hello, PeerMsg, PlayerId};
use crate::ws::{decode_frame, SessionError};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(link) = state.claim_link() else {
        warn!("Rejecting connection, match already has a guest");
        return (StatusCode::CONFLICT, "match already has a guest").into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(socket, link, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, link: PeerLink, state: AppState) {
    info!("Guest connection opened");
    state.set_guest_connected(true);

    if let Err(e) = run_session(socket, link, &state.config.peer_id).await {
        error!(error = %e, "Guest session failed");
    }

    state.set_guest_connected(false);
    info!("Guest connection closed");
}

/// Exchange hellos, then pump frames until either side goes away
async fn run_session(socket: WebSocket, link: PeerLink, local: &PlayerId) -> Result<(), SessionError> {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let PeerLink {
        inbound_tx,
        outbound_rx,
        hello_tx,
    } = link;

    send_text(&mut ws_sink, Hello::new(local.clone()).to_json()?).await?;
    let guest = read_hello(&mut ws_stream).await?;
    info!(guest = %guest, "Guest said hello");
    if hello_tx.send(guest.clone()).is_err() {
        return Err(SessionError::Closed);
    }

    // Writer task: match loop -> WebSocket
    let writer_handle = tokio::spawn(write_loop(ws_sink, outbound_rx));

    // Reader loop: WebSocket -> match loop
    let rate_limiter = PeerRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let Some(msg) = decode_frame(&text, &rate_limiter, &guest) else {
                    continue;
                };
                if inbound_tx.send(msg).await.is_err() {
                    debug!("Inbound channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(guest = %guest, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(guest = %guest, "Guest initiated close");
                break;
            }
            Err(e) => {
                error!(guest = %guest, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
    Ok(())
}

async fn read_hello(stream: &mut SplitStream<WebSocket>) -> Result<PlayerId, SessionError> {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                return Hello::from_json(&text)
                    .map(|hello| hello.peer_id)
                    .map_err(SessionError::Handshake);
            }
            Ok(Message::Close(_)) => return Err(SessionError::Closed),
            Ok(_) => continue,
            Err(e) => return Err(SessionError::Transport(e.to_string())),
        }
    }
    Err(SessionError::Closed)
}

async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut outbound_rx: mpsc::Receiver<PeerMsg>) {
    while let Some(msg) = outbound_rx.recv().await {
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!(kind = msg.kind(), error = %e, "Failed to encode message");
                continue;
            }
        };
        if let Err(e) = send_text(&mut sink, text).await {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}

async fn send_text(sink: &mut SplitSink<WebSocket, Message>, text: String) -> Result<(), SessionError> {
    sink.send(Message::Text(text))
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))
}
