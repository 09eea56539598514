//! Slam Duel - host-authoritative turn engine for a two-player physics
//! battle played over a peer-to-peer WebSocket link.
//!
//! One peer hosts: it runs the simulation, resolves damage, keeps score and
//! decides turn changes. The other joins as guest, renders what the host
//! pushes and sends launch intents when it is its turn.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
