//! Store errors.

use thiserror::Error;

/// Errors returned by [`super::EventStore`] implementations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient failure (timeout, connection drop). Reads may retry once.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the request (schema violation, auth rejection).
    /// Never retried.
    #[error("store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// True if the same request may succeed if repeated.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
