//! Process wiring around the match engine

pub mod console;
pub mod peer;
pub mod state;

pub use state::{AppState, PeerLink};
