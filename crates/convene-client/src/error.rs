//! Client-side errors.

use convene_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the session driver.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The transport could not establish or keep a channel.
    #[error("transport error: {0}")]
    Transport(String),

    /// Reconnect backoff was exhausted; the session rests disconnected.
    ///
    /// Surfaced exactly once per exhaustion; a new `open` starts a fresh
    /// attempt budget.
    #[error("connection lost after {attempts} reconnect attempts")]
    ConnectionLost {
        /// Attempts consumed before giving up.
        attempts: u32,
    },

    /// The server refused room membership.
    #[error("room access denied: {0}")]
    AccessDenied(String),

    /// An operation that needs an open room was called without one.
    #[error("no open room")]
    NoOpenRoom,

    /// A core operation failed (authorization, lookup, store).
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl ClientError {
    /// True for failures that a fresh `open` may clear.
    #[must_use]
    pub fn is_reopenable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectionLost { .. })
    }
}
