//! End-to-end tests: real WebSocket clients against a running server.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use quizden::prelude::*;
use quizden::ServerBuilder;

// =========================================================================
// Mock trivia source
// =========================================================================

#[derive(Clone)]
struct TestSource {
    items: Vec<TriviaItem>,
    ranks: Arc<Mutex<Vec<(String, TriviaRank)>>>,
}

impl TestSource {
    fn single(question: &str, answer: &str) -> Self {
        Self {
            items: vec![TriviaItem {
                question: question.into(),
                answer: answer.into(),
                source_ref: "q-1".into(),
            }],
            ranks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TriviaSource for TestSource {
    async fn fetch(
        &self,
        _query: &TriviaQuery,
    ) -> Result<Vec<TriviaItem>, TriviaError> {
        Ok(self.items.clone())
    }

    async fn submit_rank(
        &self,
        source_ref: &str,
        rank: TriviaRank,
    ) -> Result<(), TriviaError> {
        self.ranks.lock().unwrap().push((source_ref.to_string(), rank));
        Ok(())
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server(source: TestSource) -> String {
    let server = ServerBuilder::new()
        .bind("127.0.0.1:0")
        .build(source)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// One websocket client with reply/broadcast demultiplexing.
///
/// Replies echo the request seq; broadcasts can interleave with them,
/// so events seen while waiting for a reply are queued for [`event`].
struct Client {
    ws: ClientWs,
    pending: VecDeque<ServerEvent>,
    seq: u64,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("should connect");
        Self { ws, pending: VecDeque::new(), seq: 0 }
    }

    async fn recv_frame(&mut self) -> ServerFrame {
        let msg = tokio::time::timeout(Duration::from_secs(2), self.ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("ws error");
        serde_json::from_slice(&msg.into_data()).expect("decode frame")
    }

    /// Sends an event and waits for its reply, queueing broadcasts.
    async fn request(&mut self, event: ClientEvent) -> Reply {
        self.seq += 1;
        let frame = ClientFrame { seq: self.seq, event };
        let bytes = serde_json::to_string(&frame).expect("encode frame");
        self.ws.send(Message::Text(bytes.into())).await.expect("send");

        loop {
            let frame = self.recv_frame().await;
            match frame.body {
                ServerBody::Reply(reply) => {
                    assert_eq!(frame.seq, self.seq, "reply echoes request seq");
                    return reply;
                }
                ServerBody::Event(event) => self.pending.push_back(event),
            }
        }
    }

    /// Next broadcast, from the queue or the wire.
    async fn event(&mut self) -> ServerEvent {
        if let Some(event) = self.pending.pop_front() {
            return event;
        }
        loop {
            let frame = self.recv_frame().await;
            if let ServerBody::Event(event) = frame.body {
                return event;
            }
        }
    }

    async fn close(mut self) {
        self.ws.close(None).await.expect("close");
    }
}

fn code(s: &str) -> RoomCode {
    RoomCode::new(s)
}

fn create_event(c: &str, mode: GameMode, rounds: u32) -> ClientEvent {
    let mut settings = GameSettings::with_mode(mode);
    settings.number_of_rounds = rounds;
    ClientEvent::CreateGame { code: code(c), settings }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_game_returns_code() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host = Client::connect(&addr).await;

    let reply = host
        .request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    assert_eq!(reply, Reply::GameCreated { code: code("ABCD") });
}

#[tokio::test]
async fn test_duplicate_code_gets_error_reply() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host_a = Client::connect(&addr).await;
    let mut host_b = Client::connect(&addr).await;

    host_a
        .request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    let reply = host_b
        .request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    assert!(matches!(reply, Reply::Error { .. }));
}

#[tokio::test]
async fn test_join_with_invalid_code() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut player = Client::connect(&addr).await;

    let reply = player
        .request(ClientEvent::JoinGame {
            code: code("NOPE"),
            name: "alice".into(),
        })
        .await;
    assert_eq!(reply, Reply::Join { status: JoinStatus::ErrInvalidCode });
}

#[tokio::test]
async fn test_join_notifies_host() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host = Client::connect(&addr).await;
    let mut player = Client::connect(&addr).await;

    host.request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    let reply = player
        .request(ClientEvent::JoinGame {
            code: code("ABCD"),
            name: "alice".into(),
        })
        .await;
    assert_eq!(reply, Reply::Join { status: JoinStatus::AddedToLobby });

    assert_eq!(
        host.event().await,
        ServerEvent::AddPlayerToLobby { name: "alice".into() }
    );
}

#[tokio::test]
async fn test_game_control_requires_host_role() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host = Client::connect(&addr).await;
    let mut player = Client::connect(&addr).await;

    host.request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    player
        .request(ClientEvent::JoinGame {
            code: code("ABCD"),
            name: "alice".into(),
        })
        .await;

    // A player cannot start the game.
    let reply = player
        .request(ClientEvent::StartGame { code: code("ABCD") })
        .await;
    assert!(matches!(reply, Reply::Error { .. }));

    // An outsider cannot submit answers.
    let mut outsider = Client::connect(&addr).await;
    let reply = outsider
        .request(ClientEvent::SubmitAnswer {
            code: code("ABCD"),
            answer: "A".into(),
        })
        .await;
    assert!(matches!(reply, Reply::Error { .. }));
}

#[tokio::test]
async fn test_full_standard_game_over_websocket() {
    let source = TestSource::single("Capital of France?", "Paris");
    let ranks = Arc::clone(&source.ranks);
    let addr = start_server(source).await;

    let mut host = Client::connect(&addr).await;
    let mut player = Client::connect(&addr).await;

    // Lobby.
    host.request(create_event("ABCD", GameMode::Standard, 1))
        .await;
    player
        .request(ClientEvent::JoinGame {
            code: code("ABCD"),
            name: "alice".into(),
        })
        .await;
    assert_eq!(
        host.event().await,
        ServerEvent::AddPlayerToLobby { name: "alice".into() }
    );

    // Start: opening scoreboard plus a splash for everyone.
    let reply = host
        .request(ClientEvent::StartGame { code: code("ABCD") })
        .await;
    match reply {
        Reply::Scores { scores } => {
            assert_eq!(scores.round_number, 1);
            assert_eq!(scores.players[0].score, 0);
        }
        other => panic!("expected Scores, got {other:?}"),
    }
    let splash = ServerEvent::DisplaySplashScreen { round_number: 1 };
    assert_eq!(host.event().await, splash);
    assert_eq!(player.event().await, splash);

    // Round opens.
    let reply = host
        .request(ClientEvent::RequestTrivia { code: code("ABCD") })
        .await;
    assert_eq!(reply, Reply::Question { text: "Capital of France?".into() });
    let prompt = ServerEvent::DisplayTextResponsePrompt {
        prompt: PromptKind::Answer,
    };
    assert_eq!(host.event().await, prompt);
    assert_eq!(player.event().await, prompt);

    // The only player answers; that completes the quorum.
    let reply = player
        .request(ClientEvent::SubmitAnswer {
            code: code("ABCD"),
            answer: "Paris".into(),
        })
        .await;
    assert_eq!(reply, Reply::Submission { accepted: true });
    assert_eq!(host.event().await, ServerEvent::AllPlayersIn);

    // Reveal.
    let reply = host
        .request(ClientEvent::GetAnswers { code: code("ABCD") })
        .await;
    match reply {
        Reply::Answers { reveal } => {
            assert_eq!(reveal.answer, "Paris");
            assert!(reveal.players[0].correct);
        }
        other => panic!("expected Answers, got {other:?}"),
    }
    assert_eq!(host.event().await, ServerEvent::PromptTriviaRank);
    assert_eq!(player.event().await, ServerEvent::PromptTriviaRank);

    // The player rates the question; the source records it.
    let reply = player
        .request(ClientEvent::SubmitTriviaRank {
            code: code("ABCD"),
            rank: TriviaRank::Like,
        })
        .await;
    assert_eq!(reply, Reply::Ack);
    assert_eq!(
        ranks.lock().unwrap().as_slice(),
        &[("q-1".to_string(), TriviaRank::Like)]
    );

    // Single-round game: the scores request ends it.
    let reply = host
        .request(ClientEvent::RequestScores { code: code("ABCD") })
        .await;
    match reply {
        Reply::Scores { scores } => assert_eq!(scores.players[0].score, 1),
        other => panic!("expected Scores, got {other:?}"),
    }
    match host.event().await {
        ServerEvent::GameOver { scores } => {
            assert_eq!(scores.players[0].name, "alice");
            assert_eq!(scores.players[0].score, 1);
        }
        other => panic!("expected GameOver, got {other:?}"),
    }
    match player.event().await {
        ServerEvent::GameOver { .. } => {}
        other => panic!("expected GameOver, got {other:?}"),
    }
}

#[tokio::test]
async fn test_player_disconnect_notifies_host() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host = Client::connect(&addr).await;
    host.request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    let mut player = Client::connect(&addr).await;
    player
        .request(ClientEvent::JoinGame {
            code: code("ABCD"),
            name: "alice".into(),
        })
        .await;
    assert_eq!(
        host.event().await,
        ServerEvent::AddPlayerToLobby { name: "alice".into() }
    );

    player.close().await;
    assert_eq!(
        host.event().await,
        ServerEvent::RemovePlayerFromLobby { name: "alice".into() }
    );
}

#[tokio::test]
async fn test_host_disconnect_tears_down_room() {
    let addr = start_server(TestSource::single("Q?", "A")).await;
    let mut host = Client::connect(&addr).await;
    host.request(create_event("ABCD", GameMode::Standard, 10))
        .await;
    host.close().await;

    // Let the cleanup task run.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut player = Client::connect(&addr).await;
    let reply = player
        .request(ClientEvent::JoinGame {
            code: code("ABCD"),
            name: "alice".into(),
        })
        .await;
    assert_eq!(reply, Reply::Join { status: JoinStatus::ErrInvalidCode });
}

#[tokio::test]
async fn test_fibbage_round_over_websocket() {
    let addr = start_server(TestSource::single("Q?", "Truth")).await;
    let mut host = Client::connect(&addr).await;
    let mut alice = Client::connect(&addr).await;
    let mut bob = Client::connect(&addr).await;

    host.request(create_event("ABCD", GameMode::Fibbage, 1)).await;
    for (client, name) in [(&mut alice, "alice"), (&mut bob, "bob")] {
        let reply = client
            .request(ClientEvent::JoinGame {
                code: code("ABCD"),
                name: name.into(),
            })
            .await;
        assert_eq!(reply, Reply::Join { status: JoinStatus::AddedToLobby });
    }

    host.request(ClientEvent::StartGame { code: code("ABCD") })
        .await;
    host.request(ClientEvent::RequestTrivia { code: code("ABCD") })
        .await;
    assert_eq!(
        alice.event().await,
        ServerEvent::DisplaySplashScreen { round_number: 1 }
    );
    assert_eq!(
        alice.event().await,
        ServerEvent::DisplayTextResponsePrompt { prompt: PromptKind::Lie }
    );

    alice
        .request(ClientEvent::SubmitLie {
            code: code("ABCD"),
            lie: "DecoyA".into(),
        })
        .await;
    bob.request(ClientEvent::SubmitLie {
        code: code("ABCD"),
        lie: "DecoyB".into(),
    })
    .await;

    let reply = host
        .request(ClientEvent::GetLiesAndAnswer { code: code("ABCD") })
        .await;
    match reply {
        Reply::Lies { mut choices } => {
            choices.sort();
            assert_eq!(choices, vec!["DecoyA", "DecoyB", "Truth"]);
        }
        other => panic!("expected Lies, got {other:?}"),
    }

    // bob falls for alice's decoy; alice finds the truth.
    alice
        .request(ClientEvent::SubmitAnswer {
            code: code("ABCD"),
            answer: "Truth".into(),
        })
        .await;
    bob.request(ClientEvent::SubmitAnswer {
        code: code("ABCD"),
        answer: "DecoyA".into(),
    })
    .await;

    let reply = host
        .request(ClientEvent::GetAnswers { code: code("ABCD") })
        .await;
    match reply {
        Reply::Answers { reveal } => {
            assert_eq!(reveal.players[0].fooled, Some(1));
            assert!(reveal.players[0].correct);
            assert!(!reveal.players[1].correct);
        }
        other => panic!("expected Answers, got {other:?}"),
    }
}
