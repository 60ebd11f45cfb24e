//! Persistent record types.
//!
//! These are the shapes the store reads and writes. They are immutable value
//! types on the wire; all mutation goes through store primitives in
//! `convene-core`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::{CorrelationToken, EventId, MessageId, RoomId, UserId};

/// A participant's response state for one event.
///
/// `Declined` is terminal for the invite cycle that produced it; a fresh
/// invite cycle is an explicit, separate operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpStatus {
    /// Invited, no response yet.
    Invited,
    /// Accepted the invitation; an active room member.
    Accepted,
    /// Declined the invitation or left after accepting.
    Declined,
}

/// Caller role used for advisory capability checks.
///
/// The store/server side remains the authoritative enforcement point; these
/// roles only gate what the client attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative access across events.
    Admin,
    /// Owner of the event.
    Organizer,
    /// Ordinary member.
    Member,
}

/// One (event, user) participation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    /// The participating user.
    pub user_id: UserId,
    /// Current response state.
    pub status: RsvpStatus,
}

/// A scheduled event.
///
/// Owned by the organizer; immutable here except through edit operations
/// external to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier.
    pub event_id: EventId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Start of the time window, Unix milliseconds.
    pub starts_at_ms: u64,
    /// End of the time window, Unix milliseconds.
    pub ends_at_ms: u64,
    /// Free-form location.
    pub location: String,
    /// Attachment references (opaque URLs or store keys).
    pub attachments: Vec<String>,
    /// The organizer's user id.
    pub organizer: UserId,
}

/// A directory entry for a known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User identifier.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
}

/// The single discussion room bound to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Room identifier.
    pub room_id: RoomId,
    /// The owning event (1:1).
    pub event_id: EventId,
    /// Display name, derived from the event title at creation.
    pub name: String,
    /// Participant ids snapshotted when the room was created.
    ///
    /// Informational only; the live roster is always read from the registry.
    pub participant_snapshot: Vec<UserId>,
    /// Creation timestamp, Unix milliseconds.
    pub created_at_ms: u64,
}

impl RoomRecord {
    /// Derive the room display name from an event title.
    #[must_use]
    pub fn display_name(event_title: &str) -> String {
        format!("{event_title} Chat")
    }
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message identifier, store-assigned.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Sending user.
    pub sender_id: UserId,
    /// Message body.
    pub text: String,
    /// Persist timestamp, Unix milliseconds. Primary ordering key.
    pub created_at_ms: u64,
    /// Client-generated token echoed back from the submit round trip.
    pub correlation: CorrelationToken,
}

impl MessageRecord {
    /// The total ordering key: `created_at_ms` with `id` as tiebreak.
    #[must_use]
    pub fn order_key(&self) -> (u64, MessageId) {
        (self.created_at_ms, self.id)
    }
}

/// Compare two messages by timeline position.
///
/// This is the ONLY ordering used for rendering a room. Every client sorting
/// by this comparator observes the same relative order for any two delivered
/// messages.
#[must_use]
pub fn timeline_cmp(a: &MessageRecord, b: &MessageRecord) -> Ordering {
    a.order_key().cmp(&b.order_key())
}

/// Kind of a recorded notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// The recipient was invited to an event.
    Invited,
    /// A participant responded to an invitation.
    RsvpReceived,
    /// The recipient was removed from an event.
    Removed,
}

/// A notification handed to the external delivery collaborator.
///
/// Recording is in scope; delivery is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// User the notification is for.
    pub recipient: UserId,
    /// Event it concerns.
    pub event_id: EventId,
    /// What happened.
    pub kind: NotificationKind,
    /// Human-readable body.
    pub body: String,
}
