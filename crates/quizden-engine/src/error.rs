//! Error types for the game engine.

use crate::GamePhase;

/// Errors produced by [`GameSession`](crate::GameSession) operations.
///
/// These are game-rule violations, not infrastructure failures — a
/// `GameError` always means the request was understood but the room's
/// rules or current phase forbid it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    /// The display name is empty or already taken in this lobby.
    #[error("invalid player name")]
    InvalidName,

    /// The game has left the lobby; no more joins.
    #[error("game already started")]
    AlreadyStarted,

    /// The lobby is at `max_players`.
    #[error("room is full")]
    RoomFull,

    /// No player with that id is registered in this session.
    #[error("player not found")]
    PlayerNotFound,

    /// The operation is not legal in the current phase.
    #[error("expected phase {expected}, but game is in {actual}")]
    InvalidPhase {
        expected: &'static str,
        actual: GamePhase,
    },

    /// No question is loaded (e.g. a rank submitted before round 1).
    #[error("no trivia question is active")]
    NoTrivia,
}
