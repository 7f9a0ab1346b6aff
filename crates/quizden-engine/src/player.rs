//! Per-player game state.

use quizden_protocol::PlayerId;

/// One player's state within a session.
///
/// Owned entirely by the [`GameSession`](crate::GameSession); the
/// transport layer never touches this, it only knows the `PlayerId`.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,

    /// Cumulative score across rounds.
    pub score: u32,

    /// This round's answer, if submitted. Cleared between rounds.
    pub answer: Option<String>,

    /// This round's decoy (fibbage only). Cleared between rounds.
    pub lie: Option<String>,

    /// How many opponents this player's lies have caught, across the
    /// whole game.
    pub times_fooled_others: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            answer: None,
            lie: None,
            times_fooled_others: 0,
        }
    }

    /// Drops the per-round submissions, keeping score and identity.
    pub fn clear_round_state(&mut self) {
        self.answer = None;
        self.lie = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_round_state_keeps_score() {
        let mut p = Player::new(PlayerId(1), "alice");
        p.score = 3;
        p.answer = Some("x".into());
        p.lie = Some("y".into());

        p.clear_round_state();

        assert_eq!(p.score, 3);
        assert!(p.answer.is_none());
        assert!(p.lie.is_none());
    }
}
