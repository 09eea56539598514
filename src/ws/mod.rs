//! Peer channel: wire types plus both ends of the WebSocket link

pub mod client;
pub mod handler;
pub mod protocol;

use tracing::warn;

use crate::util::rate_limit::PeerRateLimiter;
use protocol::{PeerMsg, PlayerId, ProtocolError};

/// Queue depth between a socket and the match loop
pub const PEER_CHANNEL_CAPACITY: usize = 256;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("peer closed the connection before the handshake finished")]
    Closed,

    #[error("handshake failed: {0}")]
    Handshake(#[source] ProtocolError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Rate-limited decode for frames from the guest. Only guest intents go
/// through here; the host's stream has no resend and is never throttled.
pub fn decode_frame(text: &str, limiter: &PeerRateLimiter, peer: &PlayerId) -> Option<PeerMsg> {
    if !limiter.check_message() {
        warn!(peer = %peer, "Rate limited peer message");
        return None;
    }
    parse_frame(text, peer)
}

/// Turn one inbound text frame into a message, or drop it with a warning
pub fn parse_frame(text: &str, peer: &PlayerId) -> Option<PeerMsg> {
    match PeerMsg::from_json(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(peer = %peer, error = %e, "Failed to parse peer message");
            None
        }
    }
}
