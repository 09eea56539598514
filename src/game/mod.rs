//! Game simulation modules

pub mod arena;
pub mod authority;
pub mod combat;
pub mod events;
pub mod r#match;
pub mod physics;
pub mod runner;
pub mod schedule;
pub mod score;
pub mod trajectory;
pub mod turn;
pub mod unit;

pub use authority::Role;
pub use events::{EventLog, LogObserver, MatchEvent, MatchObserver};
pub use r#match::{MatchController, MatchPhase, MatchSetup, PointerEvent};
pub use runner::{LocalAction, MatchRunner, RunExit};
