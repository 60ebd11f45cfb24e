//! Async driver for a chat session.
//!
//! [`RoomDriver`] is the I/O half of the session layer: it owns the live
//! channel, the timeline, and the store-facing gateways, and executes the
//! actions the Sans-IO [`ChatSession`] produces. Every suspension point
//! lives here — channel connect, history fetch, message persistence, and
//! backoff sleeps. Dropping a driver future (close, room switch, caller
//! cancellation) cancels any in-flight backoff or history fetch; sends
//! already submitted to the store are not cancelled and reconcile through
//! the normal echo path.

use std::collections::VecDeque;

use async_trait::async_trait;
use convene_core::{
    CoreError, Environment, EventStore, MessageGateway, ParticipantRegistry, RoomRegistry,
    SessionIdentity,
    capability::Action,
    identity::BearerToken,
};
use convene_proto::{ClientSignal, EventId, MessageRecord, RoomId, ServerSignal, UserId};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    error::ClientError,
    event::{SessionAction, SessionEvent},
    session::{ChatSession, SessionConfig, SessionState},
    timeline::Timeline,
};

/// Bound for the per-room inbound signal queue.
///
/// Backpressure is explicit: a transport that outruns the driver blocks on
/// the bounded channel instead of growing an unbounded buffer.
pub const INBOUND_QUEUE_DEPTH: usize = 64;

/// Errors from channel transports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Establishing the channel failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The channel dropped mid-use.
    #[error("channel closed: {0}")]
    Closed(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A connected live channel: outbound signal submit plus a bounded inbound
/// queue.
pub struct ChannelPair {
    /// Submit signals toward the server.
    pub outbound: mpsc::Sender<ClientSignal>,
    /// Receive signals from the server (bounded to [`INBOUND_QUEUE_DEPTH`]).
    pub inbound: mpsc::Receiver<ServerSignal>,
}

/// Seam to the live-channel transport.
///
/// Implementations attach the bearer credential at connect time and speak
/// [`ClientSignal`]/[`ServerSignal`] over whatever wire they like.
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    /// Open an authenticated channel.
    async fn connect(&self, token: &BearerToken) -> Result<ChannelPair, TransportError>;
}

/// Drives one client's chat session.
///
/// At most one room is open at a time; `open` on a second room leaves the
/// first atomically with respect to delivery.
pub struct RoomDriver<S, T, E> {
    identity: SessionIdentity,
    store: S,
    registry: ParticipantRegistry<S>,
    rooms: RoomRegistry<S>,
    gateway: MessageGateway<S>,
    transport: T,
    env: E,
    session: ChatSession,
    timeline: Timeline,
    channel: Option<ChannelPair>,
    event_id: Option<EventId>,
}

impl<S, T, E> RoomDriver<S, T, E>
where
    S: EventStore,
    T: ChannelTransport,
    E: Environment,
{
    /// Create a driver for one authenticated client.
    pub fn new(identity: SessionIdentity, store: S, transport: T, env: E) -> Self {
        Self::with_config(identity, store, transport, env, SessionConfig::default())
    }

    /// Create a driver with explicit reconnect tuning.
    pub fn with_config(
        identity: SessionIdentity,
        store: S,
        transport: T,
        env: E,
        config: SessionConfig,
    ) -> Self {
        Self {
            registry: ParticipantRegistry::new(store.clone()),
            rooms: RoomRegistry::new(store.clone()),
            gateway: MessageGateway::new(store.clone()),
            identity,
            store,
            transport,
            env,
            session: ChatSession::new(config),
            timeline: Timeline::new(),
            channel: None,
            event_id: None,
        }
    }

    /// The rendered timeline for the open room.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The open room, if any.
    pub fn room(&self) -> Option<RoomId> {
        self.session.room()
    }

    /// Open the chat room for an event, creating the room on first access.
    ///
    /// Performs the advisory access check, resolves or provisions the room,
    /// joins its broadcast group, and suspends until the join is confirmed
    /// (riding the reconnect backoff if the transport flakes). Switching
    /// from another room leaves it first; its timeline is discarded.
    pub async fn open(&mut self, event_id: EventId) -> Result<RoomId, ClientError> {
        self.registry
            .require_room_access(&self.identity, event_id, Action::ReadRoom)
            .await?;

        let event = self
            .store
            .fetch_event(event_id)
            .await
            .map_err(CoreError::from)?
            .ok_or(CoreError::EventNotFound(event_id))?;

        let roster: Vec<UserId> = self
            .registry
            .participants(event_id)
            .await?
            .iter()
            .map(|p| p.user_id)
            .collect();

        let room = self
            .rooms
            .get_or_create_room(event_id, &event.title, roster)
            .await?;

        if self.session.room() != Some(room.room_id) {
            self.timeline = Timeline::new();
        }
        self.event_id = Some(event_id);

        if self.channel.is_none() {
            // First attempt inline; failures from here on ride the session's
            // backoff (the unsendable Join below reports TransportFailed).
            match self.transport.connect(&self.identity.token).await {
                Ok(pair) => self.channel = Some(pair),
                Err(e) => {
                    tracing::warn!(error = %e, "initial channel connect failed, entering backoff");
                },
            }
        }

        let actions = self.session.handle(SessionEvent::Open { room_id: room.room_id });
        self.execute(actions).await?;
        self.wait_connected().await?;

        Ok(room.room_id)
    }

    /// Close the open room. Safe to call in any state.
    pub async fn close(&mut self) {
        let actions = self.session.handle(SessionEvent::Close);
        if let Some(pair) = self.channel.as_ref() {
            for action in actions {
                if let SessionAction::Send(signal) = action {
                    // Best-effort leave; a dead channel needs no goodbye.
                    let _ = pair.outbound.send(signal).await;
                }
            }
        }
        self.channel = None;
        self.event_id = None;
    }

    /// Send a message: optimistic timeline append, persistence, broadcast.
    ///
    /// The provisional entry appears immediately; the store's confirmation
    /// replaces it in place. On persistence failure the provisional entry is
    /// withdrawn and the error surfaces — never silently retried, so a
    /// resubmit cannot double-post.
    pub async fn send(&mut self, text: &str) -> Result<MessageRecord, ClientError> {
        let event_id = self.event_id.ok_or(ClientError::NoOpenRoom)?;
        let room_id = self.session.room().ok_or(ClientError::NoOpenRoom)?;

        let correlation = self.env.random_u128();
        self.timeline
            .send_optimistic(room_id, self.identity.user_id, text, correlation);

        let record = match self.gateway.post(&self.identity, event_id, text, correlation).await {
            Ok(record) => record,
            Err(e) => {
                self.timeline.abandon(correlation);
                return Err(e.into());
            },
        };

        self.timeline.confirm(record.clone());

        // Broadcast the confirmed record. Failure here is not fatal: the
        // message is persisted and everyone else replays it from history.
        let published = match self.channel.as_ref() {
            Some(pair) => pair
                .outbound
                .send(ClientSignal::Publish { room_id, message: record.clone() })
                .await
                .is_ok(),
            None => false,
        };
        if !published {
            tracing::warn!(room_id = %room_id, "broadcast submit failed; peers rely on history");
        }

        Ok(record)
    }

    /// Wait for and process the next inbound signal.
    ///
    /// Deliveries land in the timeline; a dropped channel triggers the
    /// reconnect path before the wait resumes.
    pub async fn pump_one(&mut self) -> Result<(), ClientError> {
        loop {
            let received = match self.channel.as_mut() {
                Some(pair) => pair.inbound.recv().await,
                None => None,
            };

            match received {
                Some(signal) => {
                    let actions = self.session.handle(SessionEvent::Signal(signal));
                    return self.execute(actions).await;
                },
                None => {
                    self.channel = None;
                    let actions = self.session.handle(SessionEvent::TransportFailed);
                    if actions.is_empty() {
                        return Err(ClientError::NoOpenRoom);
                    }
                    self.execute(actions).await?;
                },
            }
        }
    }

    async fn wait_connected(&mut self) -> Result<(), ClientError> {
        while self.session.state() != SessionState::Connected {
            if self.session.state() == SessionState::Disconnected {
                // Denied or lost; execute already surfaced the specific error.
                return Err(ClientError::NoOpenRoom);
            }
            self.pump_one().await?;
        }
        Ok(())
    }

    /// Execute session actions, feeding follow-up events back through the
    /// machine until the queue drains.
    async fn execute(&mut self, actions: Vec<SessionAction>) -> Result<(), ClientError> {
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Send(signal) => {
                    let sent = match self.channel.as_ref() {
                        Some(pair) => pair.outbound.send(signal).await.is_ok(),
                        None => false,
                    };
                    if !sent {
                        self.channel = None;
                        queue.extend(self.session.handle(SessionEvent::TransportFailed));
                    }
                },
                SessionAction::FetchHistory { room_id } => {
                    let Some(event_id) = self.event_id else {
                        continue;
                    };
                    let history = self.gateway.history(&self.identity, event_id).await?;
                    tracing::debug!(
                        room_id = %room_id,
                        count = history.len(),
                        "history merged after join"
                    );
                    self.timeline.merge_history(history);
                },
                SessionAction::Deliver(message) => {
                    self.timeline.observe(message);
                },
                SessionAction::Reconnect { room_id, delay } => {
                    tracing::debug!(
                        room_id = %room_id,
                        delay_ms = delay.as_millis() as u64,
                        attempt = self.session.attempts(),
                        "reconnect backoff"
                    );
                    self.env.sleep(delay).await;
                    match self.transport.connect(&self.identity.token).await {
                        Ok(pair) => {
                            self.channel = Some(pair);
                            queue.extend(self.session.handle(SessionEvent::ChannelRestored));
                        },
                        Err(e) => {
                            tracing::warn!(error = %e, "reconnect attempt failed");
                            queue.extend(self.session.handle(SessionEvent::TransportFailed));
                        },
                    }
                },
                SessionAction::ConnectionLost { room_id, attempts } => {
                    tracing::warn!(
                        room_id = %room_id,
                        attempts,
                        "reconnect budget exhausted; session disconnected"
                    );
                    self.channel = None;
                    return Err(ClientError::ConnectionLost { attempts });
                },
                SessionAction::AccessDenied { room_id, reason } => {
                    tracing::warn!(room_id = %room_id, reason = %reason, "room membership refused");
                    self.channel = None;
                    return Err(ClientError::AccessDenied(reason));
                },
            }
        }

        Ok(())
    }
}
