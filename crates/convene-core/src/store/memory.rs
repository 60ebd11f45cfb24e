//! In-memory store for tests and simulation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use convene_proto::{
    CorrelationToken, EventId, EventRecord, MessageRecord, ParticipantRecord, RoomId, RoomRecord,
    RsvpStatus, UserId, UserRecord,
};

use super::{CasOutcome, EventStore, RoomCreation, StoreError};

/// In-memory [`EventStore`] implementation.
///
/// All state is wrapped in `Arc<Mutex<_>>` so clones share the same
/// underlying store, the way independent sessions share one backend. The
/// mutex makes every trait method a single atomic step, which is exactly the
/// per-record atomicity the contract requires. Uses `lock().expect()`, which
/// panics on a poisoned mutex — acceptable for test/simulation code.
///
/// Timestamps come from a logical millisecond clock that advances by one per
/// appended message; tests can advance it further to model gaps.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

struct MemoryStoreInner {
    events: HashMap<EventId, EventRecord>,
    users: Vec<UserRecord>,
    /// Roster per event, insertion-ordered. Uniqueness by `user_id` is
    /// enforced in `insert_participant_if_absent`.
    participants: HashMap<EventId, Vec<ParticipantRecord>>,
    rooms: HashMap<EventId, RoomRecord>,
    messages: HashMap<RoomId, Vec<MessageRecord>>,
    clock_ms: u64,
    next_room_id: RoomId,
    next_message_id: u128,
}

impl MemoryStore {
    /// Create an empty store. The logical clock starts at 1 000 ms.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner {
                events: HashMap::new(),
                users: Vec::new(),
                participants: HashMap::new(),
                rooms: HashMap::new(),
                messages: HashMap::new(),
                clock_ms: 1_000,
                next_room_id: 1,
                next_message_id: 1,
            })),
        }
    }

    /// Seed an event (test setup).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn seed_event(&self, event: EventRecord) {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.events.insert(event.event_id, event);
    }

    /// Seed a directory user (test setup).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn seed_user(&self, user: UserRecord) {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.users.push(user);
    }

    /// Advance the logical clock (test setup for timestamp gaps).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn advance_clock(&self, ms: u64) {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.clock_ms += ms;
    }

    /// Number of rooms created so far (test assertions).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    pub fn room_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").rooms.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    #[allow(clippy::expect_used)]
    async fn fetch_event(&self, event_id: EventId) -> Result<Option<EventRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.events.get(&event_id).cloned())
    }

    #[allow(clippy::expect_used)]
    async fn list_users(&self) -> Result<Vec<UserRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.users.clone())
    }

    #[allow(clippy::expect_used)]
    async fn participants(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ParticipantRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.participants.get(&event_id).cloned().unwrap_or_default())
    }

    #[allow(clippy::expect_used)]
    async fn insert_participant_if_absent(
        &self,
        event_id: EventId,
        participant: ParticipantRecord,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let roster = inner.participants.entry(event_id).or_default();

        if roster.iter().any(|p| p.user_id == participant.user_id) {
            return Ok(false);
        }

        roster.push(participant);
        Ok(true)
    }

    #[allow(clippy::expect_used)]
    async fn compare_and_update_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        expected: RsvpStatus,
        next: RsvpStatus,
    ) -> Result<CasOutcome, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        let Some(roster) = inner.participants.get_mut(&event_id) else {
            return Ok(CasOutcome::Missing);
        };
        let Some(record) = roster.iter_mut().find(|p| p.user_id == user_id) else {
            return Ok(CasOutcome::Missing);
        };

        if record.status != expected {
            return Ok(CasOutcome::Mismatch(record.status));
        }

        record.status = next;
        Ok(CasOutcome::Applied)
    }

    #[allow(clippy::expect_used)]
    async fn room_for_event(&self, event_id: EventId) -> Result<Option<RoomRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.rooms.get(&event_id).cloned())
    }

    #[allow(clippy::expect_used)]
    async fn create_room_if_absent(
        &self,
        event_id: EventId,
        name: String,
        participant_snapshot: Vec<UserId>,
    ) -> Result<RoomCreation, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        if let Some(existing) = inner.rooms.get(&event_id) {
            return Ok(RoomCreation::Existing(existing.clone()));
        }

        let room = RoomRecord {
            room_id: inner.next_room_id,
            event_id,
            name,
            participant_snapshot,
            created_at_ms: inner.clock_ms,
        };
        inner.next_room_id += 1;
        inner.rooms.insert(event_id, room.clone());

        Ok(RoomCreation::Created(room))
    }

    #[allow(clippy::expect_used)]
    async fn load_messages(&self, event_id: EventId) -> Result<Vec<MessageRecord>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        let Some(room) = inner.rooms.get(&event_id) else {
            return Ok(Vec::new());
        };
        Ok(inner.messages.get(&room.room_id).cloned().unwrap_or_default())
    }

    #[allow(clippy::expect_used)]
    async fn append_message(
        &self,
        room_id: RoomId,
        sender_id: UserId,
        text: String,
        correlation: CorrelationToken,
    ) -> Result<MessageRecord, StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let record = MessageRecord {
            id: inner.next_message_id,
            room_id,
            sender_id,
            text,
            created_at_ms: inner.clock_ms,
            correlation,
        };
        inner.next_message_id += 1;
        inner.clock_ms += 1;
        inner.messages.entry(room_id).or_default().push(record.clone());

        Ok(record)
    }
}
