//! Guest end of the peer channel

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::ws::protocol::{Hello, PeerMsg, PlayerId};
use crate::ws::{parse_frame, SessionError, PEER_CHANNEL_CAPACITY};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live connection to the host
pub struct GuestLink {
    /// Id the host announced in its hello
    pub host: PlayerId,
    pub inbound_rx: mpsc::Receiver<PeerMsg>,
    pub outbound_tx: mpsc::Sender<PeerMsg>,
}

/// Dial the host, exchange hellos and start pumping frames
pub async fn connect(url: &str, local: &PlayerId) -> Result<GuestLink, SessionError> {
    info!(url, "Connecting to host");
    let (socket, _) = connect_async(url)
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))?;
    let (mut sink, mut stream) = socket.split();

    sink.send(Message::text(Hello::new(local.clone()).to_json()?))
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))?;
    let host = read_hello(&mut stream).await?;
    info!(host = %host, "Connected to host");

    let (inbound_tx, inbound_rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(PEER_CHANNEL_CAPACITY);
    tokio::spawn(write_loop(sink, outbound_rx));
    tokio::spawn(read_loop(stream, inbound_tx, host.clone()));

    Ok(GuestLink {
        host,
        inbound_rx,
        outbound_tx,
    })
}

async fn read_hello(stream: &mut SplitStream<Socket>) -> Result<PlayerId, SessionError> {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                return Hello::from_json(text.as_str())
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

async fn read_loop(mut stream: SplitStream<Socket>, inbound_tx: mpsc::Sender<PeerMsg>, host: PlayerId) {
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let Some(msg) = parse_frame(text.as_str(), &host) else {
                    continue;
                };
                if inbound_tx.send(msg).await.is_err() {
                    debug!("Inbound channel closed");
                    break;
                }
            }
            Ok(Message::Binary(_)) => warn!(host = %host, "Received binary message, ignoring"),
            Ok(Message::Close(_)) => {
                info!(host = %host, "Host closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(host = %host, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

async fn write_loop(mut sink: SplitSink<Socket, Message>, mut outbound_rx: mpsc::Receiver<PeerMsg>) {
    while let Some(msg) = outbound_rx.recv().await {
        let text = match msg.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!(kind = msg.kind(), error = %e, "Failed to encode message");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::text(text)).await {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }
    let _ = sink.close().await;
}
