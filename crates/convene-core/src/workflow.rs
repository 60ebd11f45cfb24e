//! Invitation workflow.
//!
//! Orchestrates the pieces an invitation touches: capability check, registry
//! mutation, lazy room provisioning, and notification side effects. The
//! ordering is deliberate — registry first, room second, notifications last —
//! and failure handling is asymmetric: a registry failure aborts everything,
//! while a room or notification failure after a successful registry update is
//! tolerated (logged, retried lazily on the next chat access) rather than
//! rolled back.

use async_trait::async_trait;
use convene_proto::{
    EventId, NotificationKind, NotificationRecord, RoomRecord, RsvpStatus, UserId,
};

use crate::{
    error::CoreError,
    identity::SessionIdentity,
    registry::ParticipantRegistry,
    rooms::RoomRegistry,
    store::{EventStore, StoreError},
};

/// External notification collaborator. Recording is in scope, delivery not.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Record a notification for later delivery.
    async fn record(&self, notification: NotificationRecord) -> Result<(), StoreError>;
}

/// Result of an invitation round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteOutcome {
    /// Users actually added (idempotent skips excluded).
    pub invited: Vec<UserId>,
    /// The event's room, if it exists or was provisioned by this call.
    ///
    /// `None` means room provisioning failed and will be retried on the
    /// next chat access — the invite itself still succeeded.
    pub room: Option<RoomRecord>,
}

/// Orchestrates invitation issuance and RSVP responses.
pub struct InviteWorkflow<S, N> {
    registry: ParticipantRegistry<S>,
    rooms: RoomRegistry<S>,
    store: S,
    sink: N,
}

impl<S: EventStore, N: NotificationSink> InviteWorkflow<S, N> {
    /// Create a workflow over a shared store and a notification sink.
    pub fn new(store: S, sink: N) -> Self {
        Self {
            registry: ParticipantRegistry::new(store.clone()),
            rooms: RoomRegistry::new(store.clone()),
            store,
            sink,
        }
    }

    /// The registry this workflow drives (for follow-up queries).
    pub fn registry(&self) -> &ParticipantRegistry<S> {
        &self.registry
    }

    /// Invite users to an event.
    ///
    /// Once the registry update succeeds the operation reports success even
    /// if room provisioning or notification recording fails afterwards.
    pub async fn invite(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        user_ids: &[UserId],
    ) -> Result<InviteOutcome, CoreError> {
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;

        let invited = self.registry.invite(caller, event_id, user_ids).await?;

        // Ensure the room exists once the event has participants. A failure
        // here degrades gracefully: the next chat access retries creation.
        let room = if invited.is_empty() {
            self.rooms.room_for_event(event_id).await.ok()
        } else {
            let roster: Vec<UserId> = self
                .registry
                .participants(event_id)
                .await?
                .iter()
                .map(|p| p.user_id)
                .collect();

            match self
                .rooms
                .get_or_create_room(event_id, &event.title, roster)
                .await
            {
                Ok(room) => Some(room),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event_id,
                        error = %e,
                        "room provisioning failed after invite; will retry on next chat access"
                    );
                    None
                },
            }
        };

        for &user_id in &invited {
            self.record_notification(NotificationRecord {
                recipient: user_id,
                event_id,
                kind: NotificationKind::Invited,
                body: format!("You were invited to {}", event.title),
            })
            .await;
        }

        Ok(InviteOutcome { invited, room })
    }

    /// Record the caller's RSVP and notify the organizer.
    pub async fn rsvp(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        status: RsvpStatus,
    ) -> Result<RsvpStatus, CoreError> {
        let event = self
            .store
            .fetch_event(event_id)
            .await?
            .ok_or(CoreError::EventNotFound(event_id))?;

        let applied = self
            .registry
            .respond(caller, event_id, caller.user_id, status)
            .await?;

        self.record_notification(NotificationRecord {
            recipient: event.organizer,
            event_id,
            kind: NotificationKind::RsvpReceived,
            body: format!("User {} responded {applied:?} to {}", caller.user_id, event.title),
        })
        .await;

        Ok(applied)
    }

    /// Notification recording never fails the surrounding operation.
    async fn record_notification(&self, notification: NotificationRecord) {
        if let Err(e) = self.sink.record(notification).await {
            tracing::warn!(error = %e, "notification recording failed; continuing");
        }
    }
}

/// In-memory sink collecting recorded notifications (tests and simulation).
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: std::sync::Arc<std::sync::Mutex<Vec<NotificationRecord>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test code.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn recorded(&self) -> Vec<NotificationRecord> {
        self.inner.lock().expect("Mutex poisoned").clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    #[allow(clippy::expect_used)]
    async fn record(&self, notification: NotificationRecord) -> Result<(), StoreError> {
        self.inner.lock().expect("Mutex poisoned").push(notification);
        Ok(())
    }
}
