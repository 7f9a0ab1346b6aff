//! Core wire types for Quizden.
//!
//! Everything a client and the server exchange is defined here: identity
//! types, game settings, the inbound event set, replies, and room
//! broadcasts. The event and field names follow the original browser
//! client, so `join_game` on the wire is `ClientEvent::JoinGame` here.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for one connected participant.
///
/// Assigned by the transport when a connection is accepted; opaque to
/// clients. Within a room it identifies either the host or one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The code identifying one live room, e.g. `"KWXZ"`.
///
/// Codes are generated by the room creator (the Hub only rejects
/// collisions — see `Hub::create_game`). The conventional form is four
/// uppercase ASCII letters, which [`RoomCode::generate`] produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

/// Length of generated room codes.
const ROOM_CODE_LEN: usize = 4;

impl RoomCode {
    /// Wraps an externally supplied code as-is.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates a fresh four-letter code.
    ///
    /// 26^4 ≈ 457k possibilities; collisions against live rooms are
    /// handled by the Hub rejecting duplicate registrations, so callers
    /// retry with a new code on `DuplicateCode`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..ROOM_CODE_LEN)
            .map(|_| rng.random_range(b'A'..=b'Z') as char)
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game settings
// ---------------------------------------------------------------------------

/// The game variant for a room, chosen once at creation.
///
/// Mode-specific selectors live on the variants that need them, so a
/// `Location` game always has a zip code and a `Standard` game cannot
/// carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GameMode {
    /// Plain trivia: fetch a question, collect answers, score exact matches.
    Standard,
    /// Players submit a decoy "lie" first, then everyone answers against
    /// the shuffled set of lies plus the truth.
    Fibbage,
    /// Standard trivia drawn from content local to a zip code.
    Location { zip_code: String },
    /// Standard trivia restricted to one category.
    Category { category: String },
}

impl GameMode {
    /// Returns `true` for the lie-collecting variant.
    pub fn is_fibbage(&self) -> bool {
        matches!(self, Self::Fibbage)
    }
}

fn default_max_players() -> usize {
    10
}

fn default_rounds() -> u32 {
    10
}

fn default_response_timer() -> u64 {
    30
}

/// Immutable configuration for one room.
///
/// Arrives on `create_game` and never changes once the session starts.
/// The defaults (10 players, 10 rounds, 30 seconds to answer) apply when
/// the creator omits the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(flatten)]
    pub mode: GameMode,

    /// Maximum players allowed to join the lobby.
    #[serde(default = "default_max_players")]
    pub max_players: usize,

    /// Rounds played before the session finishes.
    #[serde(default = "default_rounds")]
    pub number_of_rounds: u32,

    /// Seconds players have to respond before the round times out.
    #[serde(default = "default_response_timer")]
    pub response_timer_secs: u64,
}

impl GameSettings {
    /// Settings for the given mode with default limits.
    pub fn with_mode(mode: GameMode) -> Self {
        Self {
            mode,
            max_players: default_max_players(),
            number_of_rounds: default_rounds(),
            response_timer_secs: default_response_timer(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared payload types
// ---------------------------------------------------------------------------

/// A player's verdict on a trivia question, fed back to the content
/// pipeline for quality ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriviaRank {
    Dislike,
    Meh,
    Like,
}

impl TriviaRank {
    /// Numeric weight used by the ranking pipeline (dislike=1 … like=3).
    pub fn weight(self) -> u8 {
        match self {
            Self::Dislike => 1,
            Self::Meh => 2,
            Self::Like => 3,
        }
    }
}

/// Outcome of a join attempt, exactly as the client sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinStatus {
    AddedToLobby,
    ErrInvalidCode,
    ErrInvalidName,
    ErrCouldNotJoin,
}

/// One row of the scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

/// Current standings, ordered by score descending (ties keep join order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub round_number: u32,
    pub players: Vec<ScoreEntry>,
}

/// One player's line in a round reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAnswer {
    pub name: String,
    /// What they submitted; empty if the round timed out on them.
    pub answer: String,
    pub correct: bool,
    /// Fibbage only: how many opponents this player's lie caught this round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fooled: Option<u32>,
}

/// The canonical answer plus every player's result for the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundReveal {
    pub answer: String,
    pub players: Vec<PlayerAnswer>,
}

/// Which kind of text response the room is being prompted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Answer,
    Lie,
}

// ---------------------------------------------------------------------------
// ClientEvent — everything a connection can send
// ---------------------------------------------------------------------------

/// An inbound event, routed to a room by its code.
///
/// The `type` tag on the wire matches the original socket event names
/// (`create_game`, `join_game`, `submit_answer`, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Host: register a new room. The host generated the code.
    CreateGame {
        code: RoomCode,
        settings: GameSettings,
    },

    /// Player: join the lobby of an existing room under a display name.
    JoinGame { code: RoomCode, name: String },

    /// Host: close the lobby and begin round 1.
    StartGame { code: RoomCode },

    /// Host: fetch current standings (also advances past a reveal).
    RequestScores { code: RoomCode },

    /// Host: fetch the next question and open the round.
    RequestTrivia { code: RoomCode },

    /// Player: submit an answer for the open round.
    SubmitAnswer { code: RoomCode, answer: String },

    /// Player (fibbage): submit a decoy answer for the open round.
    SubmitLie { code: RoomCode, lie: String },

    /// Host (fibbage): reveal the decoy set and open answering.
    GetLiesAndAnswer { code: RoomCode },

    /// Host: the response timer ran out; notify the room.
    AnswerTimeout { code: RoomCode },

    /// Host: reveal the answer and per-player results.
    GetAnswers { code: RoomCode },

    /// Player: rate the question just played.
    SubmitTriviaRank { code: RoomCode, rank: TriviaRank },
}

impl ClientEvent {
    /// The room this event is addressed to.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::CreateGame { code, .. }
            | Self::JoinGame { code, .. }
            | Self::StartGame { code }
            | Self::RequestScores { code }
            | Self::RequestTrivia { code }
            | Self::SubmitAnswer { code, .. }
            | Self::SubmitLie { code, .. }
            | Self::GetLiesAndAnswer { code }
            | Self::AnswerTimeout { code }
            | Self::GetAnswers { code }
            | Self::SubmitTriviaRank { code, .. } => code,
        }
    }
}

// ---------------------------------------------------------------------------
// Reply — the direct response to one ClientEvent
// ---------------------------------------------------------------------------

/// The server's direct answer to a request, paired with the request's
/// sequence number in its [`ServerFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    GameCreated { code: RoomCode },
    Join { status: JoinStatus },
    Scores { scores: ScoreBoard },
    Question { text: String },
    /// Whether a submitted answer or lie was recorded.
    Submission { accepted: bool },
    Answers { reveal: RoundReveal },
    /// Fibbage decoy set: every distinct lie plus the truth, shuffled.
    Lies { choices: Vec<String> },
    Ack,
    Error { message: String },
}

// ---------------------------------------------------------------------------
// ServerEvent — broadcasts pushed to the room or the host
// ---------------------------------------------------------------------------

/// An unsolicited event pushed to connections in a room.
///
/// Which connections receive it is decided by the room actor via
/// [`Recipient`]; the event itself carries no addressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Host only: a player entered the lobby.
    AddPlayerToLobby { name: String },

    /// Host only: a player left or disconnected.
    RemovePlayerFromLobby { name: String },

    /// Host only: every registered player has answered.
    AllPlayersIn,

    /// Host only: every registered player has submitted a lie.
    AllLiesIn,

    /// Room: show the between-rounds splash for the given round.
    DisplaySplashScreen { round_number: u32 },

    /// Room: prompt for a typed answer or lie.
    DisplayTextResponsePrompt { prompt: PromptKind },

    /// Room: the response window closed without full quorum.
    AnswerTimeout,

    /// Room: ask players to rate the question just revealed.
    PromptTriviaRank,

    /// Room: all rounds are done; final standings.
    GameOver { scores: ScoreBoard },
}

/// Who a [`ServerEvent`] should be delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connection in the room, host included.
    Room,
    /// The host connection only.
    Host,
    /// One specific player.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Frames — the top-level wire format
// ---------------------------------------------------------------------------

/// Client → server: one event with a client-chosen sequence number.
///
/// The server echoes `seq` on the matching [`Reply`], which is how the
/// client pairs replies with requests (the original client used
/// socket.io ack callbacks for the same purpose).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    pub seq: u64,
    pub event: ClientEvent,
}

/// The content of a [`ServerFrame`]: a reply or a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum ServerBody {
    Reply(Reply),
    Event(ServerEvent),
}

/// Server → client: `seq` echoes the request for replies and carries the
/// server's own counter for broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub seq: u64,
    pub body: ServerBody,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire shapes here are a contract with the browser client —
    //! a serde attribute change that alters the JSON breaks it, so the
    //! important tags and field names are pinned down explicitly.

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::new(s)
    }

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&code("ABCD")).unwrap();
        assert_eq!(json, "\"ABCD\"");
    }

    #[test]
    fn test_room_code_generate_is_four_uppercase_letters() {
        let mut rng = rand::rng();
        for _ in 0..32 {
            let c = RoomCode::generate(&mut rng);
            assert_eq!(c.as_str().len(), 4);
            assert!(c.as_str().chars().all(|ch| ch.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    // =====================================================================
    // GameSettings
    // =====================================================================

    #[test]
    fn test_game_mode_tag_is_flattened_into_settings() {
        let settings = GameSettings::with_mode(GameMode::Location {
            zip_code: "12180".into(),
        });
        let json = serde_json::to_value(&settings).unwrap();

        // The mode tag and its selector sit at the top level, like the
        // original create_game options object.
        assert_eq!(json["mode"], "location");
        assert_eq!(json["zip_code"], "12180");
        assert_eq!(json["max_players"], 10);
    }

    #[test]
    fn test_game_settings_defaults_apply_when_fields_missing() {
        let json = r#"{"mode": "standard"}"#;
        let settings: GameSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.mode, GameMode::Standard);
        assert_eq!(settings.max_players, 10);
        assert_eq!(settings.number_of_rounds, 10);
        assert_eq!(settings.response_timer_secs, 30);
    }

    #[test]
    fn test_game_settings_category_round_trip() {
        let settings = GameSettings {
            mode: GameMode::Category {
                category: "history".into(),
            },
            max_players: 4,
            number_of_rounds: 3,
            response_timer_secs: 15,
        };
        let bytes = serde_json::to_vec(&settings).unwrap();
        let decoded: GameSettings = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(settings, decoded);
    }

    #[test]
    fn test_game_mode_is_fibbage() {
        assert!(GameMode::Fibbage.is_fibbage());
        assert!(!GameMode::Standard.is_fibbage());
    }

    // =====================================================================
    // Shared payloads
    // =====================================================================

    #[test]
    fn test_join_status_uses_original_wire_strings() {
        let json = serde_json::to_string(&JoinStatus::AddedToLobby).unwrap();
        assert_eq!(json, "\"ADDED_TO_LOBBY\"");
        let json = serde_json::to_string(&JoinStatus::ErrInvalidCode).unwrap();
        assert_eq!(json, "\"ERR_INVALID_CODE\"");
    }

    #[test]
    fn test_trivia_rank_lowercase_and_weights() {
        let json = serde_json::to_string(&TriviaRank::Dislike).unwrap();
        assert_eq!(json, "\"dislike\"");
        assert_eq!(TriviaRank::Dislike.weight(), 1);
        assert_eq!(TriviaRank::Meh.weight(), 2);
        assert_eq!(TriviaRank::Like.weight(), 3);
    }

    #[test]
    fn test_player_answer_omits_fooled_outside_fibbage() {
        let pa = PlayerAnswer {
            name: "A".into(),
            answer: "Paris".into(),
            correct: true,
            fooled: None,
        };
        let json = serde_json::to_value(&pa).unwrap();
        assert!(json.get("fooled").is_none());
    }

    // =====================================================================
    // ClientEvent
    // =====================================================================

    #[test]
    fn test_client_event_join_game_json_format() {
        let event = ClientEvent::JoinGame {
            code: code("ROOM"),
            name: "alice".into(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "join_game");
        assert_eq!(json["code"], "ROOM");
        assert_eq!(json["name"], "alice");
    }

    #[test]
    fn test_client_event_submit_answer_round_trip() {
        let event = ClientEvent::SubmitAnswer {
            code: code("ROOM"),
            answer: "42".into(),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: ClientEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_client_event_room_code_covers_every_variant() {
        let c = code("WXYZ");
        let events = [
            ClientEvent::CreateGame {
                code: c.clone(),
                settings: GameSettings::with_mode(GameMode::Standard),
            },
            ClientEvent::JoinGame { code: c.clone(), name: "a".into() },
            ClientEvent::StartGame { code: c.clone() },
            ClientEvent::RequestScores { code: c.clone() },
            ClientEvent::RequestTrivia { code: c.clone() },
            ClientEvent::SubmitAnswer { code: c.clone(), answer: "x".into() },
            ClientEvent::SubmitLie { code: c.clone(), lie: "y".into() },
            ClientEvent::GetLiesAndAnswer { code: c.clone() },
            ClientEvent::AnswerTimeout { code: c.clone() },
            ClientEvent::GetAnswers { code: c.clone() },
            ClientEvent::SubmitTriviaRank {
                code: c.clone(),
                rank: TriviaRank::Like,
            },
        ];
        for event in &events {
            assert_eq!(event.room_code(), &c);
        }
    }

    #[test]
    fn test_decode_unknown_event_type_returns_error() {
        let unknown = r#"{"type": "fly_to_moon", "code": "ROOM"}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    // =====================================================================
    // Frames
    // =====================================================================

    #[test]
    fn test_server_frame_reply_json_format() {
        let frame = ServerFrame {
            seq: 3,
            body: ServerBody::Reply(Reply::Join {
                status: JoinStatus::AddedToLobby,
            }),
        };
        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["seq"], 3);
        assert_eq!(json["body"]["kind"], "reply");
        assert_eq!(json["body"]["body"]["type"], "join");
        assert_eq!(json["body"]["body"]["status"], "ADDED_TO_LOBBY");
    }

    #[test]
    fn test_server_frame_broadcast_round_trip() {
        let frame = ServerFrame {
            seq: 9,
            body: ServerBody::Event(ServerEvent::DisplaySplashScreen {
                round_number: 2,
            }),
        };
        let bytes = serde_json::to_vec(&frame).unwrap();
        let decoded: ServerFrame = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn test_client_frame_round_trip() {
        let frame = ClientFrame {
            seq: 1,
            event: ClientEvent::StartGame { code: code("ROOM") },
        };
        let bytes = serde_json::to_vec(&frame).unwrap();
        let decoded: ClientFrame = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientFrame, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }
}
