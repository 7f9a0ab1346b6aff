//! The trivia content seam.
//!
//! Questions come from outside the engine — a database, an HTTP
//! service, a flat file. [`TriviaSource`] is the trait that seam wears;
//! the room actor is generic over it, so tests plug in a canned source
//! and the server plugs in the real one.

use std::future::Future;

use serde::{Deserialize, Serialize};

use quizden_protocol::{GameMode, TriviaRank};

/// One playable question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriviaItem {
    pub question: String,

    /// The canonical answer, compared verbatim against submissions.
    pub answer: String,

    /// Opaque handle the source uses to identify this item when a rank
    /// comes back for it.
    pub source_ref: String,
}

/// What kind of content a room wants, derived from its game mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriviaQuery {
    /// Any question at all (standard and fibbage games).
    Any,
    /// Questions local to a zip code.
    Location { zip_code: String },
    /// Questions from one category.
    Category { category: String },
}

impl From<&GameMode> for TriviaQuery {
    fn from(mode: &GameMode) -> Self {
        match mode {
            GameMode::Standard | GameMode::Fibbage => Self::Any,
            GameMode::Location { zip_code } => Self::Location {
                zip_code: zip_code.clone(),
            },
            GameMode::Category { category } => Self::Category {
                category: category.clone(),
            },
        }
    }
}

/// Errors a trivia source can report.
#[derive(Debug, thiserror::Error)]
pub enum TriviaError {
    /// The source could not be reached or returned garbage.
    #[error("trivia source unavailable: {0}")]
    Unavailable(String),

    /// The source kept returning nothing usable; the caller gave up
    /// after `attempts` fetches.
    #[error("no trivia found after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// A supplier of trivia questions.
///
/// The futures are required to be `Send` because the room actor that
/// awaits them runs on a spawned task.
pub trait TriviaSource: Send + Sync + 'static {
    /// Fetches candidate questions matching the query.
    ///
    /// An empty `Vec` is a valid response (nothing matched); the caller
    /// decides whether to retry.
    fn fetch(
        &self,
        query: &TriviaQuery,
    ) -> impl Future<Output = Result<Vec<TriviaItem>, TriviaError>> + Send;

    /// Records a player's verdict on a previously served question.
    fn submit_rank(
        &self,
        source_ref: &str,
        rank: TriviaRank,
    ) -> impl Future<Output = Result<(), TriviaError>> + Send;
}
