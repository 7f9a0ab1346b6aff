//! Unified error type for the Quizden server.

use quizden_hub::HubError;
use quizden_protocol::ProtocolError;
use quizden_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `quizden` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizdenError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A hub- or game-level error (room not found, rule violation,
    /// trivia source failure).
    #[error(transparent)]
    Hub(#[from] HubError),
}
