//! Error types for the review scheduler and its store.

use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid grade {0}: expected a quality score between 0 and 5")]
    InvalidGrade(i64),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),
}

impl Error {
    pub fn deck_not_found(id: i64) -> Self {
        Error::NotFound { entity: "deck", id }
    }

    pub fn card_not_found(id: i64) -> Self {
        Error::NotFound { entity: "card", id }
    }

    pub fn session_not_found(id: i64) -> Self {
        Error::NotFound { entity: "session", id }
    }

    /// Caller mistakes, as opposed to transient store failures that are safe to retry.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::StoreUnavailable(_))
    }
}
