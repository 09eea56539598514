//! Application state shared across routes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::ws::protocol::{PeerMsg, PlayerId};

/// Channels handed to the guest connection once it is accepted
pub struct PeerLink {
    pub inbound_tx: mpsc::Sender<PeerMsg>,
    pub outbound_rx: mpsc::Receiver<PeerMsg>,
    /// Receives the guest's id from its hello
    pub hello_tx: oneshot::Sender<PlayerId>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    link: Arc<Mutex<Option<PeerLink>>>,
    guest_connected: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: Arc<Config>, link: PeerLink) -> Self {
        Self {
            config,
            link: Arc::new(Mutex::new(Some(link))),
            guest_connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Take the peer channels. Only the first caller gets them.
    pub fn claim_link(&self) -> Option<PeerLink> {
        self.link.lock().take()
    }

    pub fn guest_connected(&self) -> bool {
        self.guest_connected.load(Ordering::Relaxed)
    }

    pub fn set_guest_connected(&self, connected: bool) {
        self.guest_connected.store(connected, Ordering::Relaxed);
    }
}
