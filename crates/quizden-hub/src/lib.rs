//! Room hosting for Quizden.
//!
//! This crate turns the synchronous engine into a concurrent server
//! component:
//!
//! - **Actor** ([`SessionHandle`], [`OutboundSender`]) — each room is a
//!   Tokio task owning one `GameSession`; all access goes through a
//!   command channel, so room state needs no locks and game operations
//!   for one room are totally ordered.
//! - **Hub** ([`Hub`]) — the registry mapping join codes to live rooms.
//! - **Errors** ([`HubError`]) — the single error type surfaced by the
//!   handles.
//!
//! The response deadline lives inside each actor's `select!` loop, which
//! is what makes "quorum beats the timer" race-free: both outcomes are
//! decided by the same task.

mod actor;
mod error;
mod hub;

pub use actor::{
    OutboundSender, SessionHandle, SessionInfo, MAX_TRIVIA_ATTEMPTS,
};
pub use error::HubError;
pub use hub::Hub;
