//! The round phase state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle phase of a game session.
///
/// A session starts in the lobby and then cycles through the round
/// phases until every round is played:
///
/// ```text
/// Lobby → BetweenRounds → [AwaitingLies → LieRevealed →] AwaitingAnswers
///       → Revealed → BetweenRounds (next round) | Finished
/// ```
///
/// The bracketed lie phases only occur in fibbage mode.
///
/// - **Lobby**: accepting joins, game not started.
/// - **BetweenRounds**: started; waiting for the host to pull the next
///   question (the splash screen is up).
/// - **AwaitingLies**: fibbage only — collecting one decoy per player.
/// - **LieRevealed**: fibbage only — the decoy set has been handed to
///   the host; answering opens next.
/// - **AwaitingAnswers**: collecting answers against the open question.
/// - **Revealed**: answers scored and shown; waiting for the host to
///   advance via the scoreboard.
/// - **Finished**: all rounds played. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Lobby,
    BetweenRounds,
    AwaitingLies,
    LieRevealed,
    AwaitingAnswers,
    Revealed,
    Finished,
}

impl GamePhase {
    /// Returns `true` if the session is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` if players are currently submitting something
    /// (answers or lies) and the response timer may be armed.
    pub fn is_collecting(&self) -> bool {
        matches!(self, Self::AwaitingLies | Self::AwaitingAnswers)
    }

    /// Returns `true` once the session can never advance again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::BetweenRounds => write!(f, "BetweenRounds"),
            Self::AwaitingLies => write!(f, "AwaitingLies"),
            Self::LieRevealed => write!(f, "LieRevealed"),
            Self::AwaitingAnswers => write!(f, "AwaitingAnswers"),
            Self::Revealed => write!(f, "Revealed"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
