//! Wire protocol for Quizden.
//!
//! This crate defines the "language" that game hosts, players, and the
//! server speak:
//!
//! - **Types** ([`ClientEvent`], [`Reply`], [`ServerEvent`],
//!   [`GameSettings`], etc.) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those structures
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! The protocol layer sits between transport (raw frames) and the game
//! engine (room state). It knows nothing about connections or rooms —
//! only how messages are shaped.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientEvent, ClientFrame, GameMode, GameSettings, JoinStatus,
    PlayerAnswer, PlayerId, PromptKind, Recipient, Reply, RoomCode,
    RoundReveal, ScoreBoard, ScoreEntry, ServerBody, ServerEvent,
    ServerFrame, TriviaRank,
};
