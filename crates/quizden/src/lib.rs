//! Quizden — a real-time multiplayer trivia server.
//!
//! A host display creates a room and drives the game; players join by
//! a four-letter code from their phones and answer against the clock.
//! The server is a hub of isolated rooms, each running its own actor
//! task around a synchronous game state machine.
//!
//! # Layers
//!
//! - [`quizden_transport`] — WebSocket connections carrying frames.
//! - [`quizden_protocol`] — the wire vocabulary and codec.
//! - [`quizden_engine`] — rounds, quorum, scoring; no I/O.
//! - [`quizden_hub`] — room actors and the code registry.
//! - this crate — the accept loop and per-connection handlers.
//!
//! # Example
//!
//! ```rust,ignore
//! use quizden::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QuizdenError> {
//!     quizden::init_tracing();
//!     let server = ServerBuilder::new()
//!         .bind("0.0.0.0:8080")
//!         .build(MyTriviaSource::connect().await?)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod handler;
mod server;

pub use error::QuizdenError;
pub use server::{Server, ServerBuilder};

/// Installs a `tracing` subscriber reading the `RUST_LOG` environment
/// variable, defaulting to `info`.
///
/// Call once at startup; panics if a global subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Commonly used items, re-exported for one-line imports.
pub mod prelude {
    pub use crate::{QuizdenError, Server, ServerBuilder};

    pub use quizden_engine::{
        GameError, GamePhase, GameSession, TriviaError, TriviaItem,
        TriviaQuery, TriviaSource,
    };
    pub use quizden_hub::{Hub, HubError, SessionHandle};
    pub use quizden_protocol::{
        ClientEvent, ClientFrame, Codec, GameMode, GameSettings, JoinStatus,
        JsonCodec, PlayerId, PromptKind, Reply, RoomCode, RoundReveal,
        ScoreBoard, ServerBody, ServerEvent, ServerFrame, TriviaRank,
    };
    pub use quizden_transport::{
        Connection, ConnectionId, Transport, TransportError,
        WebSocketConnection, WebSocketTransport,
    };
}
