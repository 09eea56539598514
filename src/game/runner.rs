//! Fixed-rate loop driving a match controller from channels

use glam::Vec2;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::util::time::tick_duration;
use crate::ws::protocol::PeerMsg;

use super::r#match::{MatchController, MatchPhase, PointerEvent};

/// Input from the local player
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Pointer(PointerEvent),
    /// Full drag gesture on one of the local units
    Shoot { index: u8, drag: Vec2 },
    Rematch { accept: bool },
    Quit,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The match closed after the rematch prompt
    Closed,
    /// The peer connection went away
    PeerGone,
    /// The local player quit
    Quit,
}

pub struct MatchRunner {
    controller: MatchController,
    inbound_rx: mpsc::Receiver<PeerMsg>,
    outbound_tx: mpsc::Sender<PeerMsg>,
    input_rx: mpsc::Receiver<LocalAction>,
}

impl MatchRunner {
    pub fn new(
        controller: MatchController,
        inbound_rx: mpsc::Receiver<PeerMsg>,
        outbound_tx: mpsc::Sender<PeerMsg>,
        input_rx: mpsc::Receiver<LocalAction>,
    ) -> Self {
        Self {
            controller,
            inbound_rx,
            outbound_tx,
            input_rx,
        }
    }

    /// Run until the match closes, the peer disconnects or the player quits
    pub async fn run(mut self) -> RunExit {
        info!(role = %self.controller.role(), "Match loop started");

        self.controller.start();
        if !self.flush().await {
            return RunExit::PeerGone;
        }

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let exit = loop {
            tick_interval.tick().await;

            // Drain peer messages
            let mut peer_gone = false;
            loop {
                match self.inbound_rx.try_recv() {
                    Ok(msg) => self.controller.handle_message(msg),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        peer_gone = true;
                        break;
                    }
                }
            }

            // Drain local input
            let mut quit = false;
            while let Ok(action) = self.input_rx.try_recv() {
                match action {
                    LocalAction::Pointer(event) => self.controller.handle_pointer(event),
                    LocalAction::Shoot { index, drag } => {
                        if !self.controller.shoot(index, drag) {
                            info!(index, "Shot not taken");
                        }
                    }
                    LocalAction::Rematch { accept } => self.controller.request_rematch(accept),
                    LocalAction::Quit => {
                        if self.controller.phase() == MatchPhase::Ended {
                            self.controller.request_rematch(false);
                        }
                        quit = true;
                    }
                }
            }

            self.controller.tick();

            if !self.flush().await || peer_gone {
                break RunExit::PeerGone;
            }
            if quit {
                break RunExit::Quit;
            }
            if self.controller.phase() == MatchPhase::Closed {
                break RunExit::Closed;
            }
        };

        info!(?exit, ticks = self.controller.tick_count(), "Match loop stopped");
        exit
    }

    async fn flush(&mut self) -> bool {
        for msg in self.controller.drain_outbox() {
            if self.outbound_tx.send(msg).await.is_err() {
                warn!("Outbound channel closed");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::{Arena, ArenaBounds};
    use crate::game::authority::Role;
    use crate::game::r#match::MatchSetup;
    use crate::ws::protocol::PlayerId;

    fn controller(role: Role) -> MatchController {
        MatchController::new(MatchSetup {
            role,
            host: PlayerId::new("A"),
            guest: PlayerId::new("B"),
            arena: Arena::new(ArenaBounds::new(Vec2::new(125.0, 125.0), Vec2::new(1030.0, 550.0))),
            win_threshold: 5,
            seed: 3,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_guest_announces_ready_then_stops_when_peer_leaves() {
        let (inbound_tx, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, mut outbound_rx) = mpsc::channel(8);
        let (_input_tx, input_rx) = mpsc::channel(8);

        let runner = MatchRunner::new(controller(Role::Guest), inbound_rx, outbound_tx, input_rx);
        let handle = tokio::spawn(runner.run());

        assert_eq!(outbound_rx.recv().await, Some(PeerMsg::Ready));
        drop(inbound_tx);
        let exit = tokio_test::assert_ok!(handle.await);
        assert_eq!(exit, RunExit::PeerGone);
    }

    #[tokio::test]
    async fn test_quit_stops_the_loop() {
        let (_inbound_tx, inbound_rx) = mpsc::channel(8);
        let (outbound_tx, _outbound_rx) = mpsc::channel(8);
        let (input_tx, input_rx) = mpsc::channel(8);

        input_tx.send(LocalAction::Quit).await.unwrap();
        let runner = MatchRunner::new(controller(Role::Host), inbound_rx, outbound_tx, input_rx);
        assert_eq!(runner.run().await, RunExit::Quit);
    }
}
