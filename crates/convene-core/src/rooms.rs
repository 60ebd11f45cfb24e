//! Room registry.
//!
//! One room per event, created lazily on first chat access. Concurrent
//! first-access is resolved at the store's compare-and-create primitive:
//! exactly one caller creates, everyone else adopts the winning record, and
//! the race never surfaces to the caller.

use convene_proto::{EventId, RoomRecord, UserId};

use crate::{
    error::CoreError,
    store::{EventStore, RoomCreation},
};

/// Registry mapping events to their single room.
#[derive(Debug, Clone)]
pub struct RoomRegistry<S> {
    store: S,
}

impl<S: EventStore> RoomRegistry<S> {
    /// Create a registry over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The event's room, creating it on first access.
    ///
    /// The display name is derived from the event title; the participant
    /// snapshot captures the roster at creation time. Both are fixed by
    /// whichever caller wins a creation race.
    pub async fn get_or_create_room(
        &self,
        event_id: EventId,
        event_title: &str,
        participant_snapshot: Vec<UserId>,
    ) -> Result<RoomRecord, CoreError> {
        if let Some(room) = self.lookup(event_id).await? {
            return Ok(room);
        }

        let name = RoomRecord::display_name(event_title);
        match self
            .store
            .create_room_if_absent(event_id, name, participant_snapshot)
            .await?
        {
            RoomCreation::Created(room) => {
                tracing::info!(event_id = %event_id, room_id = %room.room_id, "room created");
                Ok(room)
            },
            RoomCreation::Existing(room) => {
                tracing::debug!(
                    event_id = %event_id,
                    room_id = %room.room_id,
                    "lost room creation race, adopting winner"
                );
                Ok(room)
            },
        }
    }

    /// The event's existing room. Never creates.
    ///
    /// # Errors
    ///
    /// `CoreError::RoomNotFound` if no room has been created yet.
    pub async fn room_for_event(&self, event_id: EventId) -> Result<RoomRecord, CoreError> {
        self.lookup(event_id)
            .await?
            .ok_or(CoreError::RoomNotFound(event_id))
    }

    /// Room lookup with a single retry on transient store failure.
    async fn lookup(&self, event_id: EventId) -> Result<Option<RoomRecord>, CoreError> {
        let room = match self.store.room_for_event(event_id).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(event_id = %event_id, error = %e, "retrying room lookup");
                self.store.room_for_event(event_id).await
            },
            other => other,
        }?;
        Ok(room)
    }
}
