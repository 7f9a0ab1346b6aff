//! Codec trait and implementations for serializing/deserializing frames.
//!
//! The protocol layer does not care how frames become bytes — anything
//! implementing [`Codec`] works. [`JsonCodec`] is the default (and what
//! the browser client speaks); a compact binary codec could be added
//! behind its own feature without touching any other code.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts between Rust types and raw bytes.
///
/// `Send + Sync + 'static` because the codec is stored in the shared
/// server state and used from every connection task. The methods are
/// generic so one codec handles [`ClientFrame`](crate::ClientFrame),
/// [`ServerFrame`](crate::ServerFrame), and anything else serde-shaped.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] speaking JSON via `serde_json`.
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use quizden_protocol::{
///     ClientEvent, ClientFrame, Codec, JsonCodec, RoomCode,
/// };
///
/// let codec = JsonCodec;
///
/// let frame = ClientFrame {
///     seq: 1,
///     event: ClientEvent::StartGame { code: RoomCode::new("ABCD") },
/// };
///
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ClientFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
