//! The game session state machine.
//!
//! [`GameSession`] is fully synchronous and single-owner: the room actor
//! holds it and feeds it one operation at a time, so there is no locking
//! here and every method is an atomic step of the state machine. That
//! also makes the whole quiz testable without a runtime.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use quizden_protocol::{
    GameSettings, PlayerAnswer, PlayerId, RoomCode, RoundReveal, ScoreBoard,
    ScoreEntry,
};

use crate::{GameError, GamePhase, Player, TriviaItem};

/// Compares a submission against a reference string.
///
/// The match is verbatim: no trimming, no case folding ("Paris" and
/// "paris" are different answers). Every comparison in the engine goes
/// through here, so loosening the policy is a local change.
pub fn answers_match(submitted: &str, reference: &str) -> bool {
    submitted == reference
}

// ---------------------------------------------------------------------------
// Operation outcomes
// ---------------------------------------------------------------------------

/// Result of recording a submission (answer or lie).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// `false` if this player had already submitted this round; the
    /// original submission stands.
    pub accepted: bool,

    /// `true` exactly once per collection: the moment the last
    /// outstanding player submits.
    pub quorum_complete: bool,
}

/// Result of removing a player mid-game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPlayer {
    pub name: String,

    /// `true` if this departure was the last thing the pending quorum
    /// was waiting on. The caller owes the room the same notification a
    /// final submission would have produced.
    pub quorum_now_complete: bool,
}

/// What follows a revealed round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// Play continues; the value is the new round number.
    NextRound(u32),
    /// All rounds played; final standings.
    Finished(ScoreBoard),
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

/// One room's complete game state: players, phase, scores, and the
/// question in play.
#[derive(Debug)]
pub struct GameSession {
    code: RoomCode,
    settings: GameSettings,
    phase: GamePhase,
    /// 0 in the lobby, then 1..=number_of_rounds.
    round_number: u32,
    /// Join order. Lookup is linear, which is fine at lobby sizes.
    players: Vec<Player>,
    current_item: Option<TriviaItem>,
    /// Set when the current collection's quorum notification has fired,
    /// so a departure racing a final submission can't fire it twice.
    quorum_announced: bool,
}

impl GameSession {
    pub fn new(code: RoomCode, settings: GameSettings) -> Self {
        Self {
            code,
            settings,
            phase: GamePhase::Lobby,
            round_number: 0,
            players: Vec::new(),
            current_item: None,
            quorum_announced: false,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// The text of the question in play.
    pub fn question(&self) -> Result<&str, GameError> {
        self.current_item
            .as_ref()
            .map(|item| item.question.as_str())
            .ok_or(GameError::NoTrivia)
    }

    /// The source handle of the question in play (for rank feedback).
    ///
    /// Stays valid through the reveal and scoreboard phases; it is only
    /// replaced when the next round's question loads.
    pub fn current_source_ref(&self) -> Result<&str, GameError> {
        self.current_item
            .as_ref()
            .map(|item| item.source_ref.as_str())
            .ok_or(GameError::NoTrivia)
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Registers a player in the lobby.
    ///
    /// # Errors
    /// - `AlreadyStarted` once the game has left the lobby.
    /// - `RoomFull` at `max_players`.
    /// - `InvalidName` for an empty name or one already taken.
    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: &str,
    ) -> Result<(), GameError> {
        if !self.phase.is_joinable() {
            return Err(GameError::AlreadyStarted);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(GameError::RoomFull);
        }
        if name.trim().is_empty()
            || self.players.iter().any(|p| p.name == name)
        {
            return Err(GameError::InvalidName);
        }

        debug!(code = %self.code, player_id = %id, name, "player joined");
        self.players.push(Player::new(id, name));
        Ok(())
    }

    /// Removes a player and recomputes the pending quorum.
    ///
    /// Returns `None` if the id was never registered (harmless; the
    /// caller treats it as a no-op). A departure during a collection
    /// phase can complete the quorum the room was waiting on — see
    /// [`RemovedPlayer::quorum_now_complete`].
    pub fn remove_player(&mut self, id: PlayerId) -> Option<RemovedPlayer> {
        let index = self.players.iter().position(|p| p.id == id)?;
        let removed = self.players.remove(index);
        debug!(code = %self.code, player_id = %id, name = %removed.name, "player removed");

        let quorum_now_complete = self.phase.is_collecting()
            && !self.players.is_empty()
            && self.try_announce_quorum();

        Some(RemovedPlayer {
            name: removed.name,
            quorum_now_complete,
        })
    }

    // -----------------------------------------------------------------------
    // Round lifecycle
    // -----------------------------------------------------------------------

    /// Closes the lobby and enters round 1.
    ///
    /// Returns the (all-zero) opening scoreboard for the host's display.
    pub fn start(&mut self) -> Result<ScoreBoard, GameError> {
        if self.phase != GamePhase::Lobby {
            return Err(self.phase_error("Lobby"));
        }
        self.round_number = 1;
        self.phase = GamePhase::BetweenRounds;
        debug!(code = %self.code, players = self.players.len(), "game started");
        Ok(self.scoreboard())
    }

    /// Loads the round's question and opens the first collection phase:
    /// lies in fibbage, answers otherwise.
    ///
    /// Returns the phase entered so the caller knows which prompt to
    /// broadcast.
    pub fn begin_round(
        &mut self,
        item: TriviaItem,
    ) -> Result<GamePhase, GameError> {
        if self.phase != GamePhase::BetweenRounds {
            return Err(self.phase_error("BetweenRounds"));
        }

        for player in &mut self.players {
            player.clear_round_state();
        }
        self.current_item = Some(item);
        self.quorum_announced = false;
        self.phase = if self.settings.mode.is_fibbage() {
            GamePhase::AwaitingLies
        } else {
            GamePhase::AwaitingAnswers
        };

        debug!(
            code = %self.code,
            round = self.round_number,
            phase = %self.phase,
            "round opened"
        );
        Ok(self.phase)
    }

    /// Records a player's answer for the open round.
    ///
    /// A resubmission is rejected (`accepted: false`) and the original
    /// stands, so one player can never advance the quorum count twice.
    pub fn submit_answer(
        &mut self,
        id: PlayerId,
        answer: String,
    ) -> Result<SubmitOutcome, GameError> {
        if self.phase != GamePhase::AwaitingAnswers {
            return Err(self.phase_error("AwaitingAnswers"));
        }
        let player = self.player_mut(id)?;
        if player.answer.is_some() {
            return Ok(SubmitOutcome { accepted: false, quorum_complete: false });
        }
        player.answer = Some(answer);
        let quorum_complete = self.try_announce_quorum();
        Ok(SubmitOutcome { accepted: true, quorum_complete })
    }

    /// Records a player's decoy for the open fibbage round. Same
    /// first-submission-wins rule as [`submit_answer`](Self::submit_answer).
    pub fn submit_lie(
        &mut self,
        id: PlayerId,
        lie: String,
    ) -> Result<SubmitOutcome, GameError> {
        if self.phase != GamePhase::AwaitingLies {
            return Err(self.phase_error("AwaitingLies"));
        }
        let player = self.player_mut(id)?;
        if player.lie.is_some() {
            return Ok(SubmitOutcome { accepted: false, quorum_complete: false });
        }
        player.lie = Some(lie);
        let quorum_complete = self.try_announce_quorum();
        Ok(SubmitOutcome { accepted: true, quorum_complete })
    }

    /// Closes lie collection and returns the decoy set: every distinct
    /// non-empty lie plus the canonical answer, shuffled.
    ///
    /// Lies that happen to equal the truth are dropped rather than
    /// duplicated. Players who never submitted simply contribute
    /// nothing.
    pub fn lie_choices(&mut self) -> Result<Vec<String>, GameError> {
        if self.phase != GamePhase::AwaitingLies {
            return Err(self.phase_error("AwaitingLies"));
        }
        let canonical = self
            .current_item
            .as_ref()
            .ok_or(GameError::NoTrivia)?
            .answer
            .clone();

        let mut choices: Vec<String> = vec![canonical.clone()];
        for player in &self.players {
            if let Some(lie) = &player.lie {
                if !lie.is_empty() && !choices.contains(lie) {
                    choices.push(lie.clone());
                }
            }
        }
        choices.shuffle(&mut rand::rng());

        self.phase = GamePhase::LieRevealed;
        Ok(choices)
    }

    /// Opens answer collection after the decoy set went out.
    pub fn open_answers(&mut self) -> Result<(), GameError> {
        if self.phase != GamePhase::LieRevealed {
            return Err(self.phase_error("LieRevealed"));
        }
        // Answers are a fresh collection with their own quorum.
        self.quorum_announced = false;
        self.phase = GamePhase::AwaitingAnswers;
        Ok(())
    }

    /// Closes the round: scores every submission and returns the reveal.
    ///
    /// Allowed whenever answers are being collected, quorum or not, so a
    /// timed-out round can still be revealed. Players with no answer
    /// appear with an empty one and score nothing.
    ///
    /// Scoring: one point for the canonical answer. In fibbage, one
    /// additional point per opponent caught by your lie.
    pub fn reveal_answers(&mut self) -> Result<RoundReveal, GameError> {
        if self.phase != GamePhase::AwaitingAnswers {
            return Err(self.phase_error("AwaitingAnswers"));
        }
        let canonical = self
            .current_item
            .as_ref()
            .ok_or(GameError::NoTrivia)?
            .answer
            .clone();
        let fibbage = self.settings.mode.is_fibbage();

        // Per-round fooled counts, parallel to `self.players`.
        let mut fooled = vec![0u32; self.players.len()];
        if fibbage {
            for i in 0..self.players.len() {
                let answerer = self.players[i].id;
                let Some(answer) = self.players[i].answer.clone() else {
                    continue;
                };
                if answers_match(&answer, &canonical) {
                    continue;
                }
                // Credit the first opponent whose lie caught this answer.
                // A player never scores off their own lie.
                if let Some(j) = self.players.iter().position(|q| {
                    q.id != answerer
                        && q.lie.as_deref().is_some_and(|l| answers_match(&answer, l))
                }) {
                    fooled[j] += 1;
                }
            }
        }

        let mut rows = Vec::with_capacity(self.players.len());
        for (i, player) in self.players.iter_mut().enumerate() {
            let answer = player.answer.clone().unwrap_or_default();
            let correct =
                player.answer.is_some() && answers_match(&answer, &canonical);
            if correct {
                player.score += 1;
            }
            player.score += fooled[i];
            player.times_fooled_others += fooled[i];

            rows.push(PlayerAnswer {
                name: player.name.clone(),
                answer,
                correct,
                fooled: fibbage.then_some(fooled[i]),
            });
        }

        self.phase = GamePhase::Revealed;
        debug!(code = %self.code, round = self.round_number, "round revealed");
        Ok(RoundReveal { answer: canonical, players: rows })
    }

    /// Advances past a revealed round: on to the next round's splash, or
    /// to `Finished` when the configured round count is played out.
    pub fn conclude_round(&mut self) -> Result<RoundOutcome, GameError> {
        if self.phase != GamePhase::Revealed {
            return Err(self.phase_error("Revealed"));
        }
        if self.round_number >= self.settings.number_of_rounds {
            self.phase = GamePhase::Finished;
            debug!(code = %self.code, "game finished");
            return Ok(RoundOutcome::Finished(self.scoreboard()));
        }
        self.round_number += 1;
        self.phase = GamePhase::BetweenRounds;
        Ok(RoundOutcome::NextRound(self.round_number))
    }

    /// Current standings: score descending, ties in join order.
    pub fn scoreboard(&self) -> ScoreBoard {
        let mut entries: Vec<ScoreEntry> = self
            .players
            .iter()
            .map(|p| ScoreEntry { name: p.name.clone(), score: p.score })
            .collect();
        // Stable sort, so equal scores keep join order.
        entries.sort_by_key(|e| std::cmp::Reverse(e.score));
        ScoreBoard { round_number: self.round_number, players: entries }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Checks whether every registered player has submitted for the
    /// current collection phase, and if so fires the once-per-collection
    /// latch. Returns `true` only on the firing call.
    fn try_announce_quorum(&mut self) -> bool {
        if self.quorum_announced || !self.all_submitted() {
            return false;
        }
        self.quorum_announced = true;
        true
    }

    fn all_submitted(&self) -> bool {
        match self.phase {
            GamePhase::AwaitingLies => {
                self.players.iter().all(|p| p.lie.is_some())
            }
            GamePhase::AwaitingAnswers => {
                self.players.iter().all(|p| p.answer.is_some())
            }
            _ => false,
        }
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound)
    }

    fn phase_error(&self, expected: &'static str) -> GameError {
        GameError::InvalidPhase { expected, actual: self.phase }
    }
}

// =========================================================================
// Tests
// =========================================================================
