//! Error taxonomy for core operations.
//!
//! Recovery policy is encoded next to the types: authorization, not-found,
//! transition, and validation failures surface immediately and are never
//! retried; transient store failures may be retried once on READ paths only
//! (writes surface so the caller decides whether to resubmit — a silent
//! write retry can duplicate invites or messages). Room-creation races are
//! resolved internally and never reach the caller.

use convene_proto::{EventId, RsvpStatus, UserId};
use thiserror::Error;

use crate::{capability::Action, store::StoreError};

/// Errors surfaced by registries and workflows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The caller's role does not permit the attempted action.
    ///
    /// Never retried; surfacing it leaves all state intact.
    #[error("not permitted: {role} may not {action:?}")]
    Authorization {
        /// The caller's resolved role, rendered for the message.
        role: String,
        /// The action that was refused.
        action: Action,
    },

    /// The event does not exist.
    #[error("event not found: {0:x}")]
    EventNotFound(EventId),

    /// No participant record exists for this (event, user) pair.
    #[error("no participation record for user {user_id} in event {event_id:x}")]
    ParticipantNotFound {
        /// Event looked up.
        event_id: EventId,
        /// User looked up.
        user_id: UserId,
    },

    /// No room exists for the event.
    #[error("no room for event {0:x}")]
    RoomNotFound(EventId),

    /// The requested status change is not a legal transition.
    #[error("invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status.
        from: RsvpStatus,
        /// Requested status.
        to: RsvpStatus,
    },

    /// A concurrent update won the race and a single re-read did not
    /// converge. The caller may re-inspect and resubmit.
    #[error("concurrent update conflict: {0}")]
    Conflict(String),

    /// Malformed input (empty invite set, blank message text).
    ///
    /// Surfaced immediately, never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The store request failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CoreError {
    /// True if retrying the same READ operation may succeed.
    ///
    /// Write operations must not consult this; they surface regardless.
    #[must_use]
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }
}
