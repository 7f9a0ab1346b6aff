//! Error types for the protocol layer.
//!
//! Each crate in Quizden defines its own error enum; a `ProtocolError`
//! always means a serialization problem, never networking or game state.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong
    /// types, or a truncated message.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but is invalid at the protocol level, e.g. an
    /// empty room code on an event that requires one.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}
