//! Presentation events pushed to registered observers

use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::ws::protocol::{PlayerId, UnitId};

use super::r#match::MatchPhase;

/// Something the presentation layer may want to show
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    PhaseChanged(MatchPhase),
    CoinFlipStarted {
        first_to_move: PlayerId,
        local_starts: bool,
    },
    CoinFlipRevealed {
        local_starts: bool,
    },
    TurnChanged {
        current: PlayerId,
        turn_count: u32,
        local_turn: bool,
    },
    DragIndicator {
        unit: UnitId,
        from: Vec2,
        to: Vec2,
        charge: f32,
    },
    /// Replaces any earlier preview for the unit
    TrajectoryPreview {
        unit: UnitId,
        points: Vec<Vec2>,
    },
    /// Drag line and trajectory are gone
    PreviewCleared {
        unit: UnitId,
    },
    UnitStatsChanged {
        unit: UnitId,
        hp: i32,
        attack: i32,
    },
    DefeatCeremony {
        unit: UnitId,
    },
    ScoreChanged {
        player: PlayerId,
        unit: UnitId,
        total: u32,
    },
    MatchEnded {
        winner: PlayerId,
        local_won: bool,
    },
    RematchPrompt,
    RematchStarted,
    MatchClosed {
        by_opponent: bool,
    },
}

/// Listener for match events
pub trait MatchObserver: Send {
    fn on_event(&mut self, event: &MatchEvent);
}

/// Writes events to the log; the headless binary's only "renderer"
pub struct LogObserver;

impl MatchObserver for LogObserver {
    fn on_event(&mut self, event: &MatchEvent) {
        match event {
            MatchEvent::DragIndicator { .. } | MatchEvent::TrajectoryPreview { .. } => {
                debug!(?event, "Aim update");
            }
            MatchEvent::PreviewCleared { .. } | MatchEvent::PhaseChanged(_) => {
                debug!(?event, "Match event");
            }
            MatchEvent::CoinFlipStarted { first_to_move, .. } => {
                info!(first_to_move = %first_to_move, "Coin flip");
            }
            MatchEvent::CoinFlipRevealed { local_starts } => {
                info!("{}", if *local_starts { "You start!" } else { "Opponent starts!" });
            }
            MatchEvent::TurnChanged {
                current,
                turn_count,
                local_turn,
            } => {
                info!(player = %current, turn_count, local_turn, "Turn changed");
            }
            MatchEvent::UnitStatsChanged { unit, hp, attack } => {
                info!(unit = %unit, hp, attack, "Unit stats");
            }
            MatchEvent::DefeatCeremony { unit } => {
                info!(unit = %unit, "Unit defeated");
            }
            MatchEvent::ScoreChanged { player, unit, total } => {
                info!(player = %player, unit = %unit, total, "Score");
            }
            MatchEvent::MatchEnded { winner, local_won } => {
                info!(winner = %winner, "{}", if *local_won { "You win!" } else { "You lose!" });
            }
            MatchEvent::RematchPrompt => info!("Rematch? (type `rematch` or `quit`)"),
            MatchEvent::RematchStarted => info!("Rematch starting"),
            MatchEvent::MatchClosed { by_opponent } => info!(by_opponent, "Match closed"),
        }
    }
}

/// Observer that keeps every event, shared with whoever holds a clone
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<MatchEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<MatchEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<MatchEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl MatchObserver for EventLog {
    fn on_event(&mut self, event: &MatchEvent) {
        self.events.lock().push(event.clone());
    }
}
