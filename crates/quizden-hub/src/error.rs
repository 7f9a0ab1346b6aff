//! Error types for the hub layer.

use quizden_engine::{GameError, TriviaError};
use quizden_protocol::RoomCode;

/// Errors that can occur while operating on rooms through the hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A room with this code is already live.
    #[error("room code {0} is already in use")]
    DuplicateCode(RoomCode),

    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room actor's command channel is closed or full — the room is
    /// gone or shutting down.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The room refused the operation under its game rules.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The trivia source failed while serving this room.
    #[error(transparent)]
    Trivia(#[from] TriviaError),
}
