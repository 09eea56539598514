//! Per-player, per-unit score tracking and the win condition

use std::collections::BTreeMap;

use crate::ws::protocol::{PlayerId, UnitId};

/// Default number of points a player needs to win
pub const DEFAULT_WIN_THRESHOLD: u32 = 5;

/// Score board for one match.
///
/// Players keep their insertion order; `winner` walks them in that order so
/// ties are broken by order rather than by timing.
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    scores: Vec<(PlayerId, BTreeMap<UnitId, u32>)>,
    win_threshold: u32,
}

impl ScoreBoard {
    pub fn new(players: &[PlayerId], win_threshold: u32) -> Self {
        Self {
            scores: players.iter().map(|p| (p.clone(), BTreeMap::new())).collect(),
            win_threshold,
        }
    }

    pub fn win_threshold(&self) -> u32 {
        self.win_threshold
    }

    /// Add `amount` points to `player` for `unit`. Unknown players are added.
    pub fn add_score(&mut self, player: &PlayerId, unit: UnitId, amount: u32) {
        let idx = match self.scores.iter().position(|(p, _)| p == player) {
            Some(idx) => idx,
            None => {
                self.scores.push((player.clone(), BTreeMap::new()));
                self.scores.len() - 1
            }
        };
        *self.scores[idx].1.entry(unit).or_insert(0) += amount;
    }

    pub fn unit_score(&self, player: &PlayerId, unit: UnitId) -> u32 {
        self.units(player)
            .and_then(|units| units.get(&unit).copied())
            .unwrap_or(0)
    }

    pub fn player_score(&self, player: &PlayerId) -> u32 {
        self.units(player)
            .map(|units| units.values().sum())
            .unwrap_or(0)
    }

    /// First player (in insertion order) at or above the threshold
    pub fn winner(&self) -> Option<&PlayerId> {
        self.scores
            .iter()
            .map(|(player, _)| player)
            .find(|player| self.player_score(player) >= self.win_threshold)
    }

    /// Zero every player's scores, keeping the player order
    pub fn reset(&mut self) {
        for (_, units) in &mut self.scores {
            units.clear();
        }
    }

    fn units(&self, player: &PlayerId) -> Option<&BTreeMap<UnitId, u32>> {
        self.scores
            .iter()
            .find(|(p, _)| p == player)
            .map(|(_, units)| units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Side;
    use proptest::prelude::*;

    fn pair() -> (PlayerId, PlayerId) {
        (PlayerId::new("a"), PlayerId::new("b"))
    }

    #[test]
    fn test_scores_accumulate_per_unit() {
        let (a, b) = pair();
        let mut board = ScoreBoard::new(&[a.clone(), b.clone()], 5);
        let u1 = UnitId::new(Side::Host, 0);
        let u2 = UnitId::new(Side::Host, 1);

        board.add_score(&a, u1, 1);
        board.add_score(&a, u1, 1);
        board.add_score(&a, u2, 1);

        assert_eq!(board.unit_score(&a, u1), 2);
        assert_eq!(board.unit_score(&a, u2), 1);
        assert_eq!(board.player_score(&a), 3);
        assert_eq!(board.player_score(&b), 0);
    }

    #[test]
    fn test_unknown_player_is_added() {
        let (a, b) = pair();
        let mut board = ScoreBoard::new(&[a], 5);
        board.add_score(&b, UnitId::new(Side::Guest, 0), 2);
        assert_eq!(board.player_score(&b), 2);
    }

    #[test]
    fn test_winner_ties_break_by_order() {
        let (a, b) = pair();
        let mut board = ScoreBoard::new(&[a.clone(), b.clone()], 1);
        board.add_score(&b, UnitId::new(Side::Guest, 0), 1);
        board.add_score(&a, UnitId::new(Side::Host, 0), 1);
        assert_eq!(board.winner(), Some(&a));
    }

    #[test]
    fn test_reset_keeps_players() {
        let (a, b) = pair();
        let mut board = ScoreBoard::new(&[a.clone(), b.clone()], 2);
        board.add_score(&a, UnitId::new(Side::Host, 0), 2);
        assert_eq!(board.winner(), Some(&a));
        board.reset();
        assert_eq!(board.winner(), None);
        assert_eq!(board.player_score(&a), 0);
    }

    proptest! {
        #[test]
        fn player_score_counts_every_point(units in proptest::collection::vec(0u8..3, 0..20)) {
            let (a, b) = pair();
            let mut board = ScoreBoard::new(&[a.clone(), b.clone()], DEFAULT_WIN_THRESHOLD);
            for (k, index) in units.iter().enumerate() {
                let before = board.winner().cloned();
                board.add_score(&a, UnitId::new(Side::Host, *index), 1);
                prop_assert_eq!(board.player_score(&a), k as u32 + 1);
                if (k as u32 + 1) < DEFAULT_WIN_THRESHOLD {
                    prop_assert_eq!(board.winner(), None);
                } else {
                    prop_assert_eq!(board.winner(), Some(&a));
                    if before.is_none() {
                        prop_assert_eq!(k as u32 + 1, DEFAULT_WIN_THRESHOLD);
                    }
                }
            }
        }
    }
}
