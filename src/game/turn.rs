//! Turn order among the players of a match

use rand::Rng;

use crate::ws::protocol::PlayerId;

/// Tracks whose turn it is.
///
/// Turns rotate through `players` in order; there is no terminal state, the
/// match controller decides when the match is over.
#[derive(Debug, Clone)]
pub struct TurnState {
    players: Vec<PlayerId>,
    current_index: usize,
    turn_count: u32,
}

impl TurnState {
    /// Start with a fixed turn holder
    pub fn new(players: Vec<PlayerId>, initial_holder: usize) -> Result<Self, TurnError> {
        if players.len() < 2 {
            return Err(TurnError::NotEnoughPlayers(players.len()));
        }
        if initial_holder >= players.len() {
            return Err(TurnError::HolderOutOfRange {
                index: initial_holder,
                players: players.len(),
            });
        }
        if let Some(dup) = players
            .iter()
            .enumerate()
            .find_map(|(i, p)| players[..i].contains(p).then(|| p.clone()))
        {
            return Err(TurnError::DuplicatePlayer(dup));
        }
        Ok(Self {
            players,
            current_index: initial_holder,
            turn_count: 0,
        })
    }

    /// Start with a uniformly random turn holder
    pub fn with_random_holder<R: Rng + ?Sized>(
        players: Vec<PlayerId>,
        rng: &mut R,
    ) -> Result<Self, TurnError> {
        let len = players.len();
        let initial_holder = if len == 0 { 0 } else { rng.gen_range(0..len) };
        Self::new(players, initial_holder)
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn current_player(&self) -> &PlayerId {
        &self.players[self.current_index]
    }

    pub fn current_player_index(&self) -> usize {
        self.current_index
    }

    pub fn next_player(&self) -> &PlayerId {
        &self.players[self.next_player_index()]
    }

    pub fn next_player_index(&self) -> usize {
        (self.current_index + 1) % self.players.len()
    }

    /// Number of completed turns
    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn is_my_turn(&self, local: &PlayerId) -> bool {
        self.current_player() == local
    }

    pub fn advance_turn(&mut self) {
        self.current_index = self.next_player_index();
        self.turn_count += 1;
    }

    /// Adopt a turn holder declared by the host. Does not count as a turn.
    pub fn set_current_player(&mut self, player: &PlayerId) -> Result<(), TurnError> {
        let index = self
            .players
            .iter()
            .position(|p| p == player)
            .ok_or_else(|| TurnError::UnknownPlayer(player.clone()))?;
        self.current_index = index;
        Ok(())
    }
}

/// Turn state errors
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("a match needs at least two players, got {0}")]
    NotEnoughPlayers(usize),

    #[error("initial holder {index} is out of range for {players} players")]
    HolderOutOfRange { index: usize, players: usize },

    #[error("player {0} appears twice in the turn order")]
    DuplicatePlayer(PlayerId),

    #[error("player {0} is not part of this match")]
    UnknownPlayer(PlayerId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn players(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| PlayerId::new(format!("p{i}"))).collect()
    }

    #[test]
    fn test_advance_rotates_and_counts() {
        let mut turns = TurnState::new(players(2), 0).unwrap();
        assert_eq!(turns.current_player().as_str(), "p0");
        assert_eq!(turns.next_player().as_str(), "p1");

        turns.advance_turn();
        assert_eq!(turns.current_player().as_str(), "p1");
        assert_eq!(turns.turn_count(), 1);
        assert!(turns.is_my_turn(&PlayerId::new("p1")));
        assert!(!turns.is_my_turn(&PlayerId::new("p0")));
    }

    #[test]
    fn test_set_current_player_does_not_count() {
        let mut turns = TurnState::new(players(2), 0).unwrap();
        turns.set_current_player(&PlayerId::new("p1")).unwrap();
        assert_eq!(turns.current_player_index(), 1);
        assert_eq!(turns.turn_count(), 0);
        assert!(matches!(
            turns.set_current_player(&PlayerId::new("nobody")),
            Err(TurnError::UnknownPlayer(_))
        ));
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert!(matches!(
            TurnState::new(players(1), 0),
            Err(TurnError::NotEnoughPlayers(1))
        ));
        assert!(matches!(
            TurnState::new(players(2), 2),
            Err(TurnError::HolderOutOfRange { .. })
        ));
        assert!(matches!(
            TurnState::new(vec![PlayerId::new("a"), PlayerId::new("a")], 0),
            Err(TurnError::DuplicatePlayer(_))
        ));
    }

    #[test]
    fn test_random_holder_is_seeded() {
        let a = TurnState::with_random_holder(players(2), &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        let b = TurnState::with_random_holder(players(2), &mut ChaCha8Rng::seed_from_u64(7)).unwrap();
        assert_eq!(a.current_player_index(), b.current_player_index());
    }

    proptest! {
        #[test]
        fn full_cycle_returns_to_start(n in 2usize..8, start in 0usize..8, seed in any::<u64>()) {
            let start = start % n;
            let mut turns = TurnState::new(players(n), start).unwrap();
            let original = turns.current_player().clone();
            for i in 0..n {
                prop_assert!(turns.current_player_index() < n);
                turns.advance_turn();
                prop_assert_eq!(turns.turn_count(), i as u32 + 1);
            }
            prop_assert_eq!(turns.current_player(), &original);

            let random = TurnState::with_random_holder(players(n), &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
            prop_assert!(random.current_player_index() < n);
        }
    }
}
