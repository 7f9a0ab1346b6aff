//! Game engine for Quizden.
//!
//! Everything that makes a trivia game a game lives here, with no I/O:
//!
//! - **Session** ([`GameSession`]) — the round state machine: joins,
//!   submissions, quorum, scoring, reveals.
//! - **Phase** ([`GamePhase`]) — where in the round lifecycle a session is.
//! - **Trivia** ([`TriviaSource`], [`TriviaItem`]) — the seam to the
//!   content supplier.
//! - **Errors** ([`GameError`], [`TriviaError`]) — rule violations and
//!   content failures.
//!
//! The engine is synchronous and single-owner; the hub crate wraps one
//! [`GameSession`] per room in an actor task and serializes access by
//! message passing.

mod error;
mod phase;
mod player;
mod session;
mod trivia;

pub use error::GameError;
pub use phase::GamePhase;
pub use player::Player;
pub use session::{
    answers_match, GameSession, RemovedPlayer, RoundOutcome, SubmitOutcome,
};
pub use trivia::{TriviaError, TriviaItem, TriviaQuery, TriviaSource};
