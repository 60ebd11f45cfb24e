//! Store abstraction for the collaboration core.
//!
//! The store is an opaque request/response collaborator; the core only
//! assumes per-record atomic primitives (insert-if-absent, compare-and-swap,
//! compare-and-create). Each trait method is one suspension point — the core
//! never brackets two calls in a lock.
//!
//! Implementations must be `Clone` (shared across registries and sessions,
//! typically via `Arc`) and thread-safe.

mod error;
mod memory;

use async_trait::async_trait;
use convene_proto::{
    CorrelationToken, EventId, EventRecord, MessageRecord, ParticipantRecord, RoomId, RoomRecord,
    RsvpStatus, UserId, UserRecord,
};
pub use error::StoreError;
pub use memory::MemoryStore;

/// Result of a compare-and-swap on a participant's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The expected status matched; the update was applied.
    Applied,
    /// Another writer got there first; carries the status actually found.
    Mismatch(RsvpStatus),
    /// No record exists for the (event, user) pair.
    Missing,
}

/// Result of a compare-and-create for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCreation {
    /// No room existed; this call created one.
    Created(RoomRecord),
    /// A room already existed (possibly created by a concurrent caller);
    /// this is the winning record.
    Existing(RoomRecord),
}

impl RoomCreation {
    /// The room record regardless of who created it.
    #[must_use]
    pub fn into_room(self) -> RoomRecord {
        match self {
            Self::Created(room) | Self::Existing(room) => room,
        }
    }
}

/// Request/response contract with the external store.
#[async_trait]
pub trait EventStore: Clone + Send + Sync + 'static {
    /// Fetch one event. `None` if it does not exist.
    async fn fetch_event(&self, event_id: EventId) -> Result<Option<EventRecord>, StoreError>;

    /// All known users (the invite candidate universe).
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError>;

    /// Current participant roster for an event.
    async fn participants(&self, event_id: EventId)
    -> Result<Vec<ParticipantRecord>, StoreError>;

    /// Insert a participant record unless one already exists for the user.
    ///
    /// Returns `true` if inserted, `false` if a record (any status) was
    /// already present. This is the uniqueness point for the
    /// one-record-per-(event, user) invariant.
    async fn insert_participant_if_absent(
        &self,
        event_id: EventId,
        participant: ParticipantRecord,
    ) -> Result<bool, StoreError>;

    /// Atomically replace a participant's status if it currently equals
    /// `expected`.
    async fn compare_and_update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        expected: RsvpStatus,
        next: RsvpStatus,
    ) -> Result<CasOutcome, StoreError>;

    /// The room bound to an event. `None` if none has been created.
    async fn room_for_event(&self, event_id: EventId) -> Result<Option<RoomRecord>, StoreError>;

    /// Create the event's room unless one exists.
    ///
    /// The uniqueness point for the one-room-per-event invariant: under
    /// concurrent first access exactly one caller observes `Created`; every
    /// other caller observes `Existing` with the winner's record.
    async fn create_room_if_absent(
        &self,
        event_id: EventId,
        name: String,
        participant_snapshot: Vec<UserId>,
    ) -> Result<RoomCreation, StoreError>;

    /// Full message history for an event's room, in persisted order.
    async fn load_messages(&self, event_id: EventId) -> Result<Vec<MessageRecord>, StoreError>;

    /// Persist a message, assigning the authoritative id and timestamp.
    ///
    /// The returned record carries the caller's correlation token so the
    /// submitting client can reconcile its provisional entry.
    async fn append_message(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        text: String,
        correlation: CorrelationToken,
    ) -> Result<MessageRecord, StoreError>;
}
