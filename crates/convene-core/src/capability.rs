//! Capability policy.
//!
//! One table answers every "may this role do that?" question in the
//! workspace. Registries and workflows call [`require`]; nothing checks role
//! strings at call sites. The check is advisory (UI gating) — the store side
//! remains the authoritative boundary.

use convene_proto::{EventRecord, Role, RsvpStatus};

use crate::{error::CoreError, identity::SessionIdentity};

/// Actions subject to the capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Issue invitations for an event.
    InviteParticipants,
    /// Force-decline (remove) a participant.
    RemoveParticipant,
    /// Respond to one's own invitation.
    RespondToInvite,
    /// Read a room's timeline.
    ReadRoom,
    /// Post to a room.
    PostMessage,
    /// Edit event fields (out of core; listed so gating is total).
    ManageEvent,
}

/// Resolve a caller's effective role for one event.
///
/// Admins stay admins everywhere; the event's organizer is `Organizer` for
/// that event regardless of directory role; everyone else is `Member`.
#[must_use]
pub fn resolve_role(identity: &SessionIdentity, event: &EventRecord) -> Role {
    if identity.role == Role::Admin {
        Role::Admin
    } else if event.organizer == identity.user_id {
        Role::Organizer
    } else {
        Role::Member
    }
}

/// The capability table.
#[must_use]
pub fn is_allowed(role: Role, action: Action) -> bool {
    match role {
        Role::Admin | Role::Organizer => true,
        Role::Member => matches!(
            action,
            Action::RespondToInvite | Action::ReadRoom | Action::PostMessage
        ),
    }
}

/// Check a capability, producing `CoreError::Authorization` on refusal.
pub fn require(role: Role, action: Action) -> Result<(), CoreError> {
    if is_allowed(role, action) {
        Ok(())
    } else {
        Err(CoreError::Authorization { role: format!("{role:?}"), action })
    }
}

/// Room access rule: the organizer, an admin, or an accepted participant.
///
/// Capability gates what a role may attempt; this additionally requires the
/// membership state that makes the attempt meaningful.
#[must_use]
pub fn room_access_allowed(role: Role, status: Option<RsvpStatus>) -> bool {
    match role {
        Role::Admin | Role::Organizer => true,
        Role::Member => status == Some(RsvpStatus::Accepted),
    }
}
