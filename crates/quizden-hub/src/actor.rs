//! Room actor: an isolated Tokio task that owns one game session.
//!
//! Each room runs in its own task and talks to the outside world
//! through an mpsc command channel, so the session inside never needs a
//! lock. The quorum/timeout race the design cares about disappears
//! here: submissions, departures, and the response deadline all arrive
//! through the same single-threaded loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::IndexedRandom;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use quizden_engine::{
    GameError, GamePhase, GameSession, RoundOutcome, TriviaError, TriviaItem,
    TriviaQuery, TriviaSource,
};
use quizden_protocol::{
    GameSettings, JoinStatus, PlayerId, PromptKind, Recipient, RoomCode,
    RoundReveal, ScoreBoard, ServerEvent, TriviaRank,
};

use crate::HubError;

/// How many times the actor asks the trivia source for candidates
/// before giving up on the round.
pub const MAX_TRIVIA_ATTEMPTS: u32 = 5;

/// Channel sender for delivering broadcasts to one connection handler.
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel — the
/// handle sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: OutboundSender,
        reply: oneshot::Sender<JoinStatus>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<()>,
    },
    Start {
        reply: oneshot::Sender<Result<ScoreBoard, GameError>>,
    },
    Scores {
        reply: oneshot::Sender<ScoreBoard>,
    },
    RequestTrivia {
        reply: oneshot::Sender<Result<String, HubError>>,
    },
    SubmitAnswer {
        player_id: PlayerId,
        answer: String,
        reply: oneshot::Sender<Result<bool, GameError>>,
    },
    SubmitLie {
        player_id: PlayerId,
        lie: String,
        reply: oneshot::Sender<Result<bool, GameError>>,
    },
    GetLies {
        reply: oneshot::Sender<Result<Vec<String>, GameError>>,
    },
    AnswerTimeout {
        reply: oneshot::Sender<()>,
    },
    GetAnswers {
        reply: oneshot::Sender<Result<RoundReveal, GameError>>,
    },
    SubmitRank {
        rank: TriviaRank,
        reply: oneshot::Sender<Result<(), HubError>>,
    },
    GetInfo {
        reply: oneshot::Sender<SessionInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub round_number: u32,
    pub player_count: usize,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor. Cheap to clone — it's just an
/// `mpsc::Sender` wrapper plus the room code for error reporting.
#[derive(Clone)]
pub struct SessionHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl SessionHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Registers a player and their outbound channel with the room.
    ///
    /// Rule rejections (bad name, full room, game underway) come back
    /// as a [`JoinStatus`], not an error — they are normal outcomes the
    /// client displays.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: OutboundSender,
    ) -> Result<JoinStatus, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Join { player_id, name, sender, reply: tx })
            .await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Removes a player (disconnect or explicit leave). Unknown ids are
    /// acknowledged without effect.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { player_id, reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Closes the lobby and starts round 1. Returns the opening
    /// scoreboard.
    pub async fn start(&self) -> Result<ScoreBoard, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Start { reply: tx }).await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Current standings. After a reveal this also advances the game to
    /// the next round's splash (or to game over).
    pub async fn scores(&self) -> Result<ScoreBoard, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::Scores { reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Pulls the next question from the trivia source and opens the
    /// round. Returns the question text.
    pub async fn request_trivia(&self) -> Result<String, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::RequestTrivia { reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Submits a player's answer. Returns whether it was recorded
    /// (`false` means they had already answered this round).
    pub async fn submit_answer(
        &self,
        player_id: PlayerId,
        answer: String,
    ) -> Result<bool, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::SubmitAnswer { player_id, answer, reply: tx })
            .await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Submits a player's fibbage decoy. Same acceptance rule as
    /// [`submit_answer`](Self::submit_answer).
    pub async fn submit_lie(
        &self,
        player_id: PlayerId,
        lie: String,
    ) -> Result<bool, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::SubmitLie { player_id, lie, reply: tx })
            .await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Closes lie collection, opens answering, and returns the decoy
    /// set for the host's display.
    pub async fn get_lies(&self) -> Result<Vec<String>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::GetLies { reply: tx }).await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Reports that the host's response timer expired.
    pub async fn answer_timeout(&self) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::AnswerTimeout { reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Reveals the round: canonical answer plus per-player results.
    pub async fn get_answers(&self) -> Result<RoundReveal, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::GetAnswers { reply: tx }).await?;
        Ok(rx.await.map_err(|_| self.unavailable())??)
    }

    /// Forwards a player's verdict on the current question to the
    /// trivia source.
    pub async fn submit_rank(&self, rank: TriviaRank) -> Result<(), HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::SubmitRank { rank, reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Requests a metadata snapshot.
    pub async fn info(&self) -> Result<SessionInfo, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: tx }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the room to shut down (fire-and-forget).
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), HubError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> HubError {
        HubError::Unavailable(self.code.clone())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S> {
    code: RoomCode,
    session: GameSession,
    source: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// The host's outbound channel, set at creation.
    host_sender: OutboundSender,
    /// Per-player outbound channels.
    senders: HashMap<PlayerId, OutboundSender>,
    /// Armed while a collection phase is open; `None` otherwise.
    deadline: Option<Instant>,
}

/// Resolves when the deadline passes; pends forever when unarmed. The
/// surrounding `select!` only polls this when a deadline exists, but
/// pending is the safe default either way.
async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<S: TriviaSource> RoomActor<S> {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        info!(code = %self.code, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                _ = deadline_elapsed(self.deadline), if self.deadline.is_some() => {
                    debug!(code = %self.code, "response deadline elapsed");
                    self.handle_timeout();
                }
            }
        }

        info!(code = %self.code, "room actor stopped");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { player_id, name, sender, reply } => {
                let status = self.handle_join(player_id, name, sender);
                let _ = reply.send(status);
            }
            RoomCommand::Leave { player_id, reply } => {
                self.handle_leave(player_id);
                let _ = reply.send(());
            }
            RoomCommand::Start { reply } => {
                let _ = reply.send(self.handle_start());
            }
            RoomCommand::Scores { reply } => {
                let _ = reply.send(self.handle_scores());
            }
            RoomCommand::RequestTrivia { reply } => {
                let _ = reply.send(self.handle_request_trivia().await);
            }
            RoomCommand::SubmitAnswer { player_id, answer, reply } => {
                let _ = reply.send(self.handle_submit_answer(player_id, answer));
            }
            RoomCommand::SubmitLie { player_id, lie, reply } => {
                let _ = reply.send(self.handle_submit_lie(player_id, lie));
            }
            RoomCommand::GetLies { reply } => {
                let _ = reply.send(self.handle_get_lies());
            }
            RoomCommand::AnswerTimeout { reply } => {
                self.handle_timeout();
                let _ = reply.send(());
            }
            RoomCommand::GetAnswers { reply } => {
                let _ = reply.send(self.handle_get_answers());
            }
            RoomCommand::SubmitRank { rank, reply } => {
                let _ = reply.send(self.handle_submit_rank(rank).await);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            // Handled in `run`.
            RoomCommand::Shutdown => {}
        }
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: OutboundSender,
    ) -> JoinStatus {
        match self.session.add_player(player_id, &name) {
            Ok(()) => {
                self.senders.insert(player_id, sender);
                self.broadcast(
                    Recipient::Host,
                    ServerEvent::AddPlayerToLobby { name },
                );
                JoinStatus::AddedToLobby
            }
            Err(GameError::InvalidName) => JoinStatus::ErrInvalidName,
            // Full room and in-progress game look the same to the client.
            Err(_) => JoinStatus::ErrCouldNotJoin,
        }
    }

    fn handle_leave(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        let Some(removed) = self.session.remove_player(player_id) else {
            return;
        };
        self.broadcast(
            Recipient::Host,
            ServerEvent::RemovePlayerFromLobby { name: removed.name },
        );
        // The departure may have been the last outstanding submission.
        if removed.quorum_now_complete {
            self.announce_quorum();
        }
    }

    fn handle_start(&mut self) -> Result<ScoreBoard, GameError> {
        let board = self.session.start()?;
        self.broadcast(
            Recipient::Room,
            ServerEvent::DisplaySplashScreen { round_number: 1 },
        );
        Ok(board)
    }

    fn handle_scores(&mut self) -> ScoreBoard {
        // A scores request after a reveal is the host advancing the game.
        if self.session.phase() == GamePhase::Revealed {
            if let Ok(outcome) = self.session.conclude_round() {
                match outcome {
                    RoundOutcome::NextRound(round_number) => self.broadcast(
                        Recipient::Room,
                        ServerEvent::DisplaySplashScreen { round_number },
                    ),
                    RoundOutcome::Finished(scores) => self.broadcast(
                        Recipient::Room,
                        ServerEvent::GameOver { scores },
                    ),
                }
            }
        }
        self.session.scoreboard()
    }

    async fn handle_request_trivia(&mut self) -> Result<String, HubError> {
        if self.session.phase() != GamePhase::BetweenRounds {
            return Err(GameError::InvalidPhase {
                expected: "BetweenRounds",
                actual: self.session.phase(),
            }
            .into());
        }

        let query = TriviaQuery::from(&self.session.settings().mode);
        let item = self.fetch_item(&query).await?;
        let phase = self.session.begin_round(item)?;

        let prompt = if phase == GamePhase::AwaitingLies {
            PromptKind::Lie
        } else {
            PromptKind::Answer
        };
        self.broadcast(
            Recipient::Room,
            ServerEvent::DisplayTextResponsePrompt { prompt },
        );
        self.arm_timer();

        Ok(self.session.question()?.to_string())
    }

    /// Asks the source for candidates, up to [`MAX_TRIVIA_ATTEMPTS`]
    /// times, and picks one uniformly at random. Empty responses and
    /// source errors both count as failed attempts.
    async fn fetch_item(
        &self,
        query: &TriviaQuery,
    ) -> Result<TriviaItem, HubError> {
        for attempt in 1..=MAX_TRIVIA_ATTEMPTS {
            match self.source.fetch(query).await {
                Ok(items) => {
                    if let Some(item) = items.choose(&mut rand::rng()) {
                        return Ok(item.clone());
                    }
                    debug!(
                        code = %self.code,
                        attempt,
                        "trivia fetch returned no candidates"
                    );
                }
                Err(err) => {
                    warn!(code = %self.code, attempt, %err, "trivia fetch failed");
                }
            }
        }
        Err(TriviaError::Exhausted { attempts: MAX_TRIVIA_ATTEMPTS }.into())
    }

    fn handle_submit_answer(
        &mut self,
        player_id: PlayerId,
        answer: String,
    ) -> Result<bool, GameError> {
        let outcome = self.session.submit_answer(player_id, answer)?;
        if outcome.quorum_complete {
            self.announce_quorum();
        }
        Ok(outcome.accepted)
    }

    fn handle_submit_lie(
        &mut self,
        player_id: PlayerId,
        lie: String,
    ) -> Result<bool, GameError> {
        let outcome = self.session.submit_lie(player_id, lie)?;
        if outcome.quorum_complete {
            self.announce_quorum();
        }
        Ok(outcome.accepted)
    }

    fn handle_get_lies(&mut self) -> Result<Vec<String>, GameError> {
        let choices = self.session.lie_choices()?;
        self.session.open_answers()?;
        self.broadcast(
            Recipient::Room,
            ServerEvent::DisplayTextResponsePrompt {
                prompt: PromptKind::Answer,
            },
        );
        self.arm_timer();
        Ok(choices)
    }

    fn handle_get_answers(&mut self) -> Result<RoundReveal, GameError> {
        let reveal = self.session.reveal_answers()?;
        self.deadline = None;
        self.broadcast(Recipient::Room, ServerEvent::PromptTriviaRank);
        Ok(reveal)
    }

    async fn handle_submit_rank(
        &mut self,
        rank: TriviaRank,
    ) -> Result<(), HubError> {
        let source_ref = self.session.current_source_ref()?.to_string();
        if let Err(err) = self.source.submit_rank(&source_ref, rank).await {
            warn!(code = %self.code, %err, "rank submission failed");
            return Err(err.into());
        }
        Ok(())
    }

    /// Shared by the client's `answer_timeout` event and the actor's own
    /// deadline. Outside a collection phase it just disarms (the timer
    /// already lost the race against quorum).
    fn handle_timeout(&mut self) {
        self.deadline = None;
        if self.session.phase().is_collecting() {
            self.broadcast(Recipient::Room, ServerEvent::AnswerTimeout);
        }
    }

    /// Quorum reached for the current collection: stop the clock and
    /// tell the host. The session's once-per-collection latch guarantees
    /// this runs at most once per collection.
    fn announce_quorum(&mut self) {
        self.deadline = None;
        let event = match self.session.phase() {
            GamePhase::AwaitingLies => ServerEvent::AllLiesIn,
            _ => ServerEvent::AllPlayersIn,
        };
        self.broadcast(Recipient::Host, event);
    }

    fn arm_timer(&mut self) {
        let secs = self.session.settings().response_timer_secs;
        self.deadline = Some(Instant::now() + Duration::from_secs(secs));
    }

    /// Delivers an event to the chosen recipients. Closed channels are
    /// silently skipped (the connection is already gone).
    fn broadcast(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::Room => {
                let _ = self.host_sender.send(event.clone());
                for sender in self.senders.values() {
                    let _ = sender.send(event.clone());
                }
            }
            Recipient::Host => {
                let _ = self.host_sender.send(event);
            }
            Recipient::Player(player_id) => {
                if let Some(sender) = self.senders.get(&player_id) {
                    let _ = sender.send(event);
                }
            }
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            code: self.code.clone(),
            phase: self.session.phase(),
            round_number: self.session.round_number(),
            player_count: self.session.player_count(),
        }
    }
}

/// Spawns a room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command inbox; when it fills, callers wait.
pub(crate) fn spawn_session<S: TriviaSource>(
    code: RoomCode,
    settings: GameSettings,
    source: Arc<S>,
    host_sender: OutboundSender,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        session: GameSession::new(code.clone(), settings),
        source,
        receiver: rx,
        host_sender,
        senders: HashMap::new(),
        deadline: None,
    };

    tokio::spawn(actor.run());

    SessionHandle { code, sender: tx }
}
