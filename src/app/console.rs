//! Line-based local input for the headless binary

use glam::Vec2;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::LocalAction;

/// Parse one console line.
///
/// `shoot <index> <dx> <dy>` drags unit `index` by `(dx, dy)` and releases;
/// the unit flies the opposite way. `rematch`, `decline` and `quit` answer
/// the end-of-match prompt.
pub fn parse_line(line: &str) -> Option<LocalAction> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "shoot" => {
            let index = parts.next()?.parse().ok()?;
            let dx: f32 = parts.next()?.parse().ok()?;
            let dy: f32 = parts.next()?.parse().ok()?;
            if parts.next().is_some() || !dx.is_finite() || !dy.is_finite() {
                return None;
            }
            Some(LocalAction::Shoot {
                index,
                drag: Vec2::new(dx, dy),
            })
        }
        "rematch" => Some(LocalAction::Rematch { accept: true }),
        "decline" => Some(LocalAction::Rematch { accept: false }),
        "quit" | "exit" => Some(LocalAction::Quit),
        _ => None,
    }
}

/// Read stdin until it closes, forwarding parsed commands
pub async fn run_console(input_tx: mpsc::Sender<LocalAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_line(&line) {
                Some(action) => {
                    if input_tx.send(action).await.is_err() {
                        break;
                    }
                }
                None => warn!(line, "Unknown command (shoot <i> <dx> <dy> | rematch | decline | quit)"),
            },
            Ok(None) => {
                debug!("Console closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Console read failed");
                break;
            }
        }
    }
}
