//! Per-connection handler: event dispatch, the outbound broadcast pump,
//! and disconnect cleanup.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. A connection takes exactly one role during its lifetime:
//! the host of one room (it sent `create_game`) or a player in one room
//! (it sent `join_game`). Replies echo the request's `seq`; room
//! broadcasts arrive through the pump task with the server's own
//! counter.

use std::sync::Arc;

use tokio::sync::mpsc;

use quizden_engine::TriviaSource;
use quizden_hub::{HubError, SessionHandle};
use quizden_protocol::{
    ClientEvent, ClientFrame, Codec, JoinStatus, PlayerId, Reply, RoomCode,
    ServerBody, ServerFrame,
};
use quizden_transport::{Connection, WebSocketConnection};

use crate::server::ServerState;
use crate::QuizdenError;

/// Which side of the game this connection is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Host,
    Player(PlayerId),
}

/// The one room this connection belongs to.
#[derive(Debug, Clone)]
struct Membership {
    code: RoomCode,
    role: Role,
}

/// Drop guard that cleans up a connection's room state when the handler
/// exits, however it exits.
///
/// A departing player is removed from their session; a departing host
/// tears the whole room down (rooms cannot outlive their display). Drop
/// is synchronous, so the async work runs in a fire-and-forget task.
struct ConnectionGuard<S: TriviaSource, C: Codec> {
    state: Arc<ServerState<S, C>>,
    membership: Membership,
}

impl<S: TriviaSource, C: Codec> Drop for ConnectionGuard<S, C> {
    fn drop(&mut self) {
        let state = Arc::clone(&self.state);
        let membership = self.membership.clone();
        tokio::spawn(async move {
            match membership.role {
                Role::Host => {
                    // Lock only to unregister; shutdown is delivered
                    // through the returned handle without it.
                    let handle =
                        state.hub.lock().await.remove_game(&membership.code);
                    if let Some(handle) = handle {
                        let _ = handle.shutdown().await;
                    }
                }
                Role::Player(player_id) => {
                    // Lock only for the lookup; leave() goes through the
                    // cloned handle.
                    let handle =
                        state.hub.lock().await.lookup(&membership.code);
                    if let Some(handle) = handle {
                        let _ = handle.leave(player_id).await;
                    }
                }
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), QuizdenError>
where
    S: TriviaSource,
    C: Codec + Clone,
{
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    let conn = Arc::new(conn);
    tracing::debug!(%conn_id, "handling new connection");

    // Outbound pump: room broadcasts → frames on the socket. Runs until
    // the room drops our sender or the socket dies.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let pump = {
        let conn = Arc::clone(&conn);
        let codec = state.codec.clone();
        tokio::spawn(async move {
            let mut seq: u64 = 1;
            while let Some(event) = event_rx.recv().await {
                let frame =
                    ServerFrame { seq, body: ServerBody::Event(event) };
                seq += 1;
                let Ok(bytes) = codec.encode(&frame) else { break };
                if conn.send(&bytes).await.is_err() {
                    break;
                }
            }
        })
    };

    let mut membership: Option<Membership> = None;
    let mut guard: Option<ConnectionGuard<S, C>> = None;

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let frame: ClientFrame = match state.codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                continue;
            }
        };

        let reply = dispatch_event(
            &state,
            &event_tx,
            player_id,
            &mut membership,
            frame.event,
        )
        .await;

        // Arm the cleanup guard the moment a room claims this connection.
        if guard.is_none() {
            if let Some(membership) = &membership {
                guard = Some(ConnectionGuard {
                    state: Arc::clone(&state),
                    membership: membership.clone(),
                });
            }
        }

        let out = ServerFrame { seq: frame.seq, body: ServerBody::Reply(reply) };
        let bytes = state.codec.encode(&out)?;
        conn.send(&bytes).await.map_err(QuizdenError::Transport)?;
    }

    pump.abort();
    // `guard` drops here → room cleanup fires.
    Ok(())
}

/// Routes one client event and produces its reply. Rule violations and
/// infrastructure failures both come back as replies; nothing here
/// closes the connection.
async fn dispatch_event<S, C>(
    state: &Arc<ServerState<S, C>>,
    event_tx: &quizden_hub::OutboundSender,
    player_id: PlayerId,
    membership: &mut Option<Membership>,
    event: ClientEvent,
) -> Reply
where
    S: TriviaSource,
    C: Codec,
{
    match event {
        ClientEvent::CreateGame { code, settings } => {
            if membership.is_some() {
                return error_reply("connection already belongs to a room");
            }
            let result = state.hub.lock().await.create_game(
                code.clone(),
                settings,
                event_tx.clone(),
            );
            match result {
                Ok(_handle) => {
                    *membership =
                        Some(Membership { code: code.clone(), role: Role::Host });
                    Reply::GameCreated { code }
                }
                // Covers the code collision; the client generates a
                // fresh code and retries.
                Err(e) => error_reply(e),
            }
        }

        ClientEvent::JoinGame { code, name } => {
            if membership.is_some() {
                return Reply::Join { status: JoinStatus::ErrCouldNotJoin };
            }
            let Some(handle) = state.hub.lock().await.lookup(&code) else {
                return Reply::Join { status: JoinStatus::ErrInvalidCode };
            };
            match handle.join(player_id, name, event_tx.clone()).await {
                Ok(status) => {
                    if status == JoinStatus::AddedToLobby {
                        *membership = Some(Membership {
                            code,
                            role: Role::Player(player_id),
                        });
                    }
                    Reply::Join { status }
                }
                Err(e) => error_reply(e),
            }
        }

        // Host-side game control.
        ClientEvent::StartGame { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.start().await {
                    Ok(scores) => Reply::Scores { scores },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::RequestScores { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.scores().await {
                    Ok(scores) => Reply::Scores { scores },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::RequestTrivia { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.request_trivia().await {
                    Ok(text) => Reply::Question { text },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::GetLiesAndAnswer { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.get_lies().await {
                    Ok(choices) => Reply::Lies { choices },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::AnswerTimeout { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.answer_timeout().await {
                    Ok(()) => Reply::Ack,
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::GetAnswers { code } => {
            match host_session(state, membership, &code).await {
                Ok(handle) => match handle.get_answers().await {
                    Ok(reveal) => Reply::Answers { reveal },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }

        // Player-side submissions.
        ClientEvent::SubmitAnswer { code, answer } => {
            match player_session(state, membership, &code).await {
                Ok(handle) => {
                    match handle.submit_answer(player_id, answer).await {
                        Ok(accepted) => Reply::Submission { accepted },
                        Err(e) => error_reply(e),
                    }
                }
                Err(reply) => reply,
            }
        }
        ClientEvent::SubmitLie { code, lie } => {
            match player_session(state, membership, &code).await {
                Ok(handle) => match handle.submit_lie(player_id, lie).await {
                    Ok(accepted) => Reply::Submission { accepted },
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
        ClientEvent::SubmitTriviaRank { code, rank } => {
            match player_session(state, membership, &code).await {
                Ok(handle) => match handle.submit_rank(rank).await {
                    Ok(()) => Reply::Ack,
                    Err(e) => error_reply(e),
                },
                Err(reply) => reply,
            }
        }
    }
}

/// Resolves the session handle for a host-only event: the connection
/// must be the host of exactly the room it names.
async fn host_session<S, C>(
    state: &Arc<ServerState<S, C>>,
    membership: &Option<Membership>,
    code: &RoomCode,
) -> Result<SessionHandle, Reply>
where
    S: TriviaSource,
    C: Codec,
{
    session_for_role(state, membership, code, Role::Host).await
}

/// Resolves the session handle for a player event.
async fn player_session<S, C>(
    state: &Arc<ServerState<S, C>>,
    membership: &Option<Membership>,
    code: &RoomCode,
) -> Result<SessionHandle, Reply>
where
    S: TriviaSource,
    C: Codec,
{
    let Some(m) = membership else {
        return Err(error_reply("connection is not in a room"));
    };
    if !matches!(m.role, Role::Player(_)) || m.code != *code {
        return Err(error_reply("not a player in that room"));
    }
    lookup(state, code).await
}

async fn session_for_role<S, C>(
    state: &Arc<ServerState<S, C>>,
    membership: &Option<Membership>,
    code: &RoomCode,
    role: Role,
) -> Result<SessionHandle, Reply>
where
    S: TriviaSource,
    C: Codec,
{
    let Some(m) = membership else {
        return Err(error_reply("connection is not in a room"));
    };
    if m.role != role || m.code != *code {
        return Err(error_reply("not the host of that room"));
    }
    lookup(state, code).await
}

async fn lookup<S, C>(
    state: &Arc<ServerState<S, C>>,
    code: &RoomCode,
) -> Result<SessionHandle, Reply>
where
    S: TriviaSource,
    C: Codec,
{
    state
        .hub
        .lock()
        .await
        .lookup(code)
        .ok_or_else(|| error_reply(HubError::NotFound(code.clone())))
}

fn error_reply(err: impl std::fmt::Display) -> Reply {
    Reply::Error { message: err.to_string() }
}
