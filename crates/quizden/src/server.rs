//! `Server` builder and accept loop.
//!
//! This is the entry point for running a Quizden server. It ties the
//! layers together: transport → protocol → hub → engine.

use std::sync::Arc;

use quizden_engine::TriviaSource;
use quizden_hub::Hub;
use quizden_protocol::{Codec, JsonCodec};
use quizden_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::QuizdenError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The hub
/// lock is held only for registry operations (create, lookup, remove);
/// all game traffic goes through cloned session handles without it.
pub(crate) struct ServerState<S: TriviaSource, C: Codec> {
    pub(crate) hub: Mutex<Hub<S>>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Quizden server.
///
/// # Example
///
/// ```rust,ignore
/// use quizden::prelude::*;
///
/// let server = ServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(my_trivia_source)
///     .await?;
/// server.run().await
/// ```
pub struct ServerBuilder {
    bind_addr: String,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Builds the server around the given trivia source.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` (what the browser
    /// clients speak).
    pub async fn build<S: TriviaSource>(
        self,
        source: S,
    ) -> Result<Server<S, JsonCodec>, QuizdenError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            hub: Mutex::new(Hub::new(Arc::new(source))),
            codec: JsonCodec,
        });

        Ok(Server { transport, state })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Quizden server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct Server<S: TriviaSource, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> Server<S, C>
where
    S: TriviaSource,
    C: Codec + Clone,
{
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, QuizdenError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop.
    ///
    /// Spawns a handler task per connection. Runs until the process is
    /// terminated.
    pub async fn run(mut self) -> Result<(), QuizdenError> {
        tracing::info!("Quizden server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
