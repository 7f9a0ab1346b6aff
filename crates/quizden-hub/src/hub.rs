//! The hub: creates, tracks, and routes to live rooms by code.

use std::collections::HashMap;
use std::sync::Arc;

use quizden_engine::TriviaSource;
use quizden_protocol::{GameSettings, RoomCode};
use tracing::info;

use crate::actor::{spawn_session, OutboundSender, SessionHandle};
use crate::HubError;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Registry of all live rooms, keyed by their join code.
///
/// One hub per server, shared behind a lock by the connection handlers.
/// The hub itself does no game work — it spawns room actors and hands
/// out [`SessionHandle`]s; everything after lookup happens lock-free
/// through the handle.
pub struct Hub<S: TriviaSource> {
    sessions: HashMap<RoomCode, SessionHandle>,
    source: Arc<S>,
}

impl<S: TriviaSource> Hub<S> {
    /// Creates an empty hub. Every room it spawns draws questions from
    /// `source`.
    pub fn new(source: Arc<S>) -> Self {
        Self { sessions: HashMap::new(), source }
    }

    /// Registers a new room under `code` and spawns its actor.
    ///
    /// The caller (the host's connection) picked the code; a collision
    /// with a live room is rejected and the caller retries with a fresh
    /// code.
    ///
    /// # Errors
    /// Returns `HubError::DuplicateCode` if a live room already uses it.
    pub fn create_game(
        &mut self,
        code: RoomCode,
        settings: GameSettings,
        host_sender: OutboundSender,
    ) -> Result<SessionHandle, HubError> {
        if self.sessions.contains_key(&code) {
            return Err(HubError::DuplicateCode(code));
        }

        let handle = spawn_session(
            code.clone(),
            settings,
            Arc::clone(&self.source),
            host_sender,
            DEFAULT_CHANNEL_SIZE,
        );
        self.sessions.insert(code.clone(), handle.clone());
        info!(%code, "game created");
        Ok(handle)
    }

    /// Drops a room from the registry and returns its handle.
    ///
    /// Synchronous on purpose: the server holds the registry lock while
    /// calling this, and a wedged room actor with a full inbox must not
    /// be able to stall the registry. The caller delivers
    /// [`SessionHandle::shutdown`] through the returned handle after
    /// releasing the lock.
    ///
    /// Idempotent: removing a code that is not live returns `None`.
    pub fn remove_game(&mut self, code: &RoomCode) -> Option<SessionHandle> {
        let handle = self.sessions.remove(code)?;
        info!(%code, "game removed");
        Some(handle)
    }

    /// Returns a handle to the room with this code, if live.
    pub fn lookup(&self, code: &RoomCode) -> Option<SessionHandle> {
        self.sessions.get(code).cloned()
    }

    /// Number of live rooms.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
