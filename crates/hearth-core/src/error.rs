//! The engine's error taxonomy.
//!
//! Everything except `Unavailable` is a terminal classification: retrying
//! with the same input cannot change the outcome, and callers surface the
//! message verbatim. `Unavailable` is infrastructure trouble; callers may
//! retry with identical input under their own budget; the engine itself
//! never retries validation or redemption.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    /// Caller input that no invitation could ever match; user-correctable.
    #[error("invalid code: {0}")]
    MalformedCode(String),
    #[error("no invitation matches this code")]
    NotFound,
    #[error("this invitation has expired")]
    Expired,
    #[error("this invitation has been revoked")]
    Revoked,
    /// Deliberately silent about who consumed it.
    #[error("this invitation has already been used")]
    AlreadyConsumed,
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl InviteError {
    /// Safe to retry with the same normalized code and identity.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InviteError::Unavailable(_))
    }

    pub(crate) fn unavailable(cause: impl std::fmt::Display) -> Self {
        InviteError::Unavailable(cause.to_string())
    }
}
