//! Participant status transition rules.
//!
//! Pure functions over [`RsvpStatus`]; the registry applies them at the
//! store boundary with compare-and-swap. Keeping the rules separate from the
//! I/O makes every legal and illegal transition table-testable.
//!
//! # State machine
//!
//! ```text
//! ┌─────────┐  accept   ┌──────────┐
//! │ Invited │──────────>│ Accepted │
//! └─────────┘           └──────────┘
//!      │ decline             │ decline ("leave")
//!      ↓                     ↓
//! ┌──────────┐          ┌──────────┐
//! │ Declined │<─────────│ Declined │
//! └──────────┘          └──────────┘
//! ```
//!
//! `Declined` is terminal within an invite cycle. Re-entering the machine
//! requires the explicit reinvite operation (`Declined -> Invited`), which is
//! a separate, organizer-gated decision.

use convene_proto::RsvpStatus;

use crate::error::CoreError;

/// Apply a participant's own RSVP.
///
/// Same-status responses are rejected rather than treated as no-ops: a
/// client resubmitting its current state is out of sync, and surfacing that
/// beats silently confirming it.
///
/// # Errors
///
/// `CoreError::InvalidTransition` for same-status responses, any transition
/// out of `Declined`, and any transition into `Invited`.
pub fn rsvp_transition(current: RsvpStatus, requested: RsvpStatus) -> Result<RsvpStatus, CoreError> {
    match (current, requested) {
        (RsvpStatus::Invited, RsvpStatus::Accepted)
        | (RsvpStatus::Invited, RsvpStatus::Declined)
        | (RsvpStatus::Accepted, RsvpStatus::Declined) => Ok(requested),
        (from, to) => Err(CoreError::InvalidTransition { from, to }),
    }
}

/// Organizer/admin force-decline.
///
/// Allowed from any state. Returns `None` when the record is already
/// declined (no write needed), `Some(Declined)` otherwise.
#[must_use]
pub fn forced_decline(current: RsvpStatus) -> Option<RsvpStatus> {
    match current {
        RsvpStatus::Declined => None,
        RsvpStatus::Invited | RsvpStatus::Accepted => Some(RsvpStatus::Declined),
    }
}

/// The explicit reinvite decision point: `Declined -> Invited`.
///
/// # Errors
///
/// `CoreError::InvalidTransition` unless the record is currently declined —
/// reinviting a live participant would silently reset their response.
pub fn reinvite_transition(current: RsvpStatus) -> Result<RsvpStatus, CoreError> {
    match current {
        RsvpStatus::Declined => Ok(RsvpStatus::Invited),
        from => Err(CoreError::InvalidTransition { from, to: RsvpStatus::Invited }),
    }
}
