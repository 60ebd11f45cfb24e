//! Participant registry.
//!
//! Applies the pure transition rules from [`crate::participant`] at the
//! store boundary. Writes go through insert-if-absent and compare-and-swap
//! primitives: a CAS miss is re-derived against the re-read status once,
//! then surfaces [`CoreError::Conflict`]. Reads are retried once on
//! transient store failures; writes never retry silently.

use convene_proto::{
    EventId, EventRecord, ParticipantRecord, Role, RsvpStatus, UserId, UserRecord,
};

use crate::{
    capability::{self, Action, resolve_role},
    error::CoreError,
    identity::SessionIdentity,
    participant::{forced_decline, reinvite_transition, rsvp_transition},
    store::{CasOutcome, EventStore},
};

/// Registry of participants per event.
///
/// Cheap to clone when the store is (implementations share backing state).
#[derive(Debug, Clone)]
pub struct ParticipantRegistry<S> {
    store: S,
}

impl<S: EventStore> ParticipantRegistry<S> {
    /// Create a registry over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Issue invitations for a set of users.
    ///
    /// Idempotent per user: anyone with an existing record — invited,
    /// accepted, or declined — is skipped. Returns the users actually added.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` for an empty user set
    /// - `CoreError::Authorization` unless the caller resolves to
    ///   organizer/admin for this event
    /// - `CoreError::EventNotFound` if the event does not exist
    pub async fn invite(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        user_ids: &[UserId],
    ) -> Result<Vec<UserId>, CoreError> {
        if user_ids.is_empty() {
            return Err(CoreError::Validation(
                "invite requires at least one user".to_string(),
            ));
        }

        let event = self.fetch_event_checked(event_id).await?;
        capability::require(resolve_role(caller, &event), Action::InviteParticipants)?;

        let mut added = Vec::new();
        for &user_id in user_ids {
            let record = ParticipantRecord { user_id, status: RsvpStatus::Invited };
            if self.store.insert_participant_if_absent(event_id, record).await? {
                added.push(user_id);
            }
        }

        tracing::info!(
            event_id = %event_id,
            requested = user_ids.len(),
            added = added.len(),
            "invitations issued"
        );

        Ok(added)
    }

    /// Record a participant's own RSVP.
    ///
    /// Only the participant (or an admin acting for them) may respond.
    /// Same-status responses are rejected; see [`crate::participant`].
    ///
    /// # Errors
    ///
    /// - `CoreError::ParticipantNotFound` if no invite exists — a response
    ///   never creates a record implicitly
    /// - `CoreError::InvalidTransition` per the state machine
    /// - `CoreError::Conflict` if a concurrent update wins twice
    pub async fn respond(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        user_id: UserId,
        requested: RsvpStatus,
    ) -> Result<RsvpStatus, CoreError> {
        if caller.user_id != user_id && caller.role != Role::Admin {
            return Err(CoreError::Authorization {
                role: format!("{:?}", caller.role),
                action: Action::RespondToInvite,
            });
        }

        let current = self
            .participant_status(event_id, user_id)
            .await?
            .ok_or(CoreError::ParticipantNotFound { event_id, user_id })?;

        let next = rsvp_transition(current, requested)?;
        match self
            .store
            .compare_and_update_status(event_id, user_id, current, next)
            .await?
        {
            CasOutcome::Applied => Ok(next),
            CasOutcome::Missing => Err(CoreError::ParticipantNotFound { event_id, user_id }),
            CasOutcome::Mismatch(actual) => {
                tracing::debug!(
                    event_id = %event_id,
                    user_id,
                    ?actual,
                    "rsvp lost a race, re-deriving against current status"
                );
                let next = rsvp_transition(actual, requested)?;
                match self
                    .store
                    .compare_and_update_status(event_id, user_id, actual, next)
                    .await?
                {
                    CasOutcome::Applied => Ok(next),
                    _ => Err(CoreError::Conflict(format!(
                        "participant {user_id} in event {event_id:x} changed concurrently"
                    ))),
                }
            },
        }
    }

    /// Organizer/admin force-decline of a participant.
    ///
    /// Declines from any state; an already-declined record is left untouched.
    ///
    /// # Errors
    ///
    /// - `CoreError::Authorization` for non-privileged callers
    /// - `CoreError::ParticipantNotFound` if no record exists
    pub async fn reject(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        let event = self.fetch_event_checked(event_id).await?;
        capability::require(resolve_role(caller, &event), Action::RemoveParticipant)?;

        let current = self
            .participant_status(event_id, user_id)
            .await?
            .ok_or(CoreError::ParticipantNotFound { event_id, user_id })?;

        let Some(next) = forced_decline(current) else {
            return Ok(());
        };

        match self
            .store
            .compare_and_update_status(event_id, user_id, current, next)
            .await?
        {
            CasOutcome::Applied => {
                tracing::info!(event_id = %event_id, user_id, "participant force-declined");
                Ok(())
            },
            CasOutcome::Missing => Err(CoreError::ParticipantNotFound { event_id, user_id }),
            CasOutcome::Mismatch(actual) => {
                // Whatever state won the race, force-decline still applies
                // (or is already done).
                let Some(next) = forced_decline(actual) else {
                    return Ok(());
                };
                match self
                    .store
                    .compare_and_update_status(event_id, user_id, actual, next)
                    .await?
                {
                    CasOutcome::Applied => Ok(()),
                    _ => Err(CoreError::Conflict(format!(
                        "participant {user_id} in event {event_id:x} changed concurrently"
                    ))),
                }
            },
        }
    }

    /// The explicit re-invite decision point: `Declined -> Invited`.
    ///
    /// A plain `invite` treats declined users as a no-op, so bringing one
    /// back requires this deliberate, organizer-gated call.
    ///
    /// # Errors
    ///
    /// Same authorization as [`Self::invite`]; `CoreError::InvalidTransition`
    /// unless the record is currently declined.
    pub async fn reinvite(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        let event = self.fetch_event_checked(event_id).await?;
        capability::require(resolve_role(caller, &event), Action::InviteParticipants)?;

        let current = self
            .participant_status(event_id, user_id)
            .await?
            .ok_or(CoreError::ParticipantNotFound { event_id, user_id })?;
        let next = reinvite_transition(current)?;

        match self
            .store
            .compare_and_update_status(event_id, user_id, current, next)
            .await?
        {
            CasOutcome::Applied => {
                tracing::info!(event_id = %event_id, user_id, "participant re-invited");
                Ok(())
            },
            CasOutcome::Missing => Err(CoreError::ParticipantNotFound { event_id, user_id }),
            CasOutcome::Mismatch(actual) => Err(reinvite_transition(actual)
                .err()
                .unwrap_or_else(|| {
                    CoreError::Conflict(format!(
                        "participant {user_id} in event {event_id:x} changed concurrently"
                    ))
                })),
        }
    }

    /// Users who can still be invited: the directory minus every current
    /// participant (any status).
    ///
    /// Always read fresh from the store — no caching beyond this call.
    pub async fn list_available(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
    ) -> Result<Vec<UserRecord>, CoreError> {
        let event = self.fetch_event_checked(event_id).await?;
        capability::require(resolve_role(caller, &event), Action::InviteParticipants)?;

        let users = self.list_users_once_retried().await?;
        let roster = self.participants(event_id).await?;

        Ok(users
            .into_iter()
            .filter(|u| !roster.iter().any(|p| p.user_id == u.user_id))
            .collect())
    }

    /// Current roster for an event. Reads retry once on transient failure.
    pub async fn participants(
        &self,
        event_id: EventId,
    ) -> Result<Vec<ParticipantRecord>, CoreError> {
        let roster = match self.store.participants(event_id).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(event_id = %event_id, error = %e, "retrying roster read");
                self.store.participants(event_id).await
            },
            other => other,
        }?;
        Ok(roster)
    }

    /// Enforce the room access rule for a caller (read or post).
    ///
    /// # Errors
    ///
    /// `CoreError::Authorization` unless the caller is the organizer, an
    /// admin, or an accepted participant.
    pub async fn require_room_access(
        &self,
        caller: &SessionIdentity,
        event_id: EventId,
        action: Action,
    ) -> Result<(), CoreError> {
        let event = self.fetch_event_checked(event_id).await?;
        let role = resolve_role(caller, &event);
        let status = self.participant_status(event_id, caller.user_id).await?;

        if capability::room_access_allowed(role, status) {
            Ok(())
        } else {
            Err(CoreError::Authorization { role: format!("{role:?}"), action })
        }
    }

    async fn participant_status(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<RsvpStatus>, CoreError> {
        let roster = self.participants(event_id).await?;
        Ok(roster.iter().find(|p| p.user_id == user_id).map(|p| p.status))
    }

    async fn fetch_event_checked(&self, event_id: EventId) -> Result<EventRecord, CoreError> {
        let fetched = match self.store.fetch_event(event_id).await {
            Err(e) if e.is_transient() => {
                tracing::debug!(event_id = %event_id, error = %e, "retrying event fetch");
                self.store.fetch_event(event_id).await
            },
            other => other,
        }?;
        fetched.ok_or(CoreError::EventNotFound(event_id))
    }

    async fn list_users_once_retried(&self) -> Result<Vec<UserRecord>, CoreError> {
        let users = match self.store.list_users().await {
            Err(e) if e.is_transient() => self.store.list_users().await,
            other => other,
        }?;
        Ok(users)
    }
}
