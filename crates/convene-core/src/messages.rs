//! Message history and submission.
//!
//! The request/response half of chat: history loads and persistence of
//! outbound messages, both gated by the room access rule. The live broadcast
//! half lives in `convene-client`.

use convene_proto::{CorrelationToken, EventId, MessageRecord, timeline_cmp};

use crate::{
    capability::Action,
    error::CoreError,
    identity::SessionIdentity,
    registry::ParticipantRegistry,
    rooms::RoomRegistry,
    store::EventStore,
};

/// Store-facing message operations for one client.
#[derive(Debug, Clone)]
pub struct MessageGateway<S> {
    store: S,
    registry: ParticipantRegistry<S>,
    rooms: RoomRegistry<S>,
}

impl<S: EventStore> MessageGateway<S> {
    /// Create a gateway over a shared store.
    pub fn new(store: S) -> Self {
        Self {
            registry: ParticipantRegistry::new(store.clone()),
            rooms: RoomRegistry::new(store.clone()),
            store,
        }
    }

    /// Load an event's full history, sorted by the timeline order.
    ///
    /// Reads retry once on transient store failure. Access requires the
    /// caller to be the organizer, an admin, or an accepted participant.
    pub async fn history(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
    ) -> Result<Vec<MessageRecord>, CoreError> {
        self.registry
            .require_room_access(caller, event_id, Action::ReadRoom)
            .await?;

        let mut messages = match self.store.load_messages(event_id).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(event_id = %event_id, error = %e, "retrying history load");
                self.store.load_messages(event_id).await
            },
            other => other,
        }?;

        messages.sort_by(timeline_cmp);
        Ok(messages)
    }

    /// Persist an outbound message and return the confirmed record.
    ///
    /// NOT retried on failure — a duplicate append would show the message
    /// twice for everyone. The caller decides whether to resubmit.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` for blank text
    /// - `CoreError::Authorization` per the room access rule
    /// - `CoreError::RoomNotFound` if no room exists yet
    pub async fn post(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        text: &str,
        correlation: CorrelationToken,
    ) -> Result<MessageRecord, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation("message text is blank".to_string()));
        }

        self.registry
            .require_room_access(caller, event_id, Action::PostMessage)
            .await?;

        let room = self.rooms.room_for_event(event_id).await?;
        let record = self
            .store
            .append_message(room.room_id, caller.user_id, text.to_string(), correlation)
            .await?;

        Ok(record)
    }
}
