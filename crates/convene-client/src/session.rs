//! Chat session state machine.
//!
//! One state machine per client, pairing it with at most one room at a time.
//! Pure: no I/O, no clock — backoff delays are computed and handed to the
//! driver inside [`SessionAction::Reconnect`], and the driver does the
//! sleeping.
//!
//! # State machine
//!
//! ```text
//! ┌──────────────┐  Open    ┌────────────┐  Joined   ┌───────────┐
//! │ Disconnected │─────────>│ Connecting │──────────>│ Connected │
//! └──────────────┘          └────────────┘           └───────────┘
//!        ↑                        ↑                        │
//!        │ exhausted              │ ChannelRestored        │ TransportFailed
//!        │                   ┌──────────────┐              │
//!        └───────────────────│ Reconnecting │<─────────────┘
//!                            └──────────────┘
//! ```
//!
//! Delivery rules:
//! - at most once per message id within one connection (rejoins clear the
//!   dedup set; cross-connection duplicates are the reconciler's job)
//! - nothing from a room after leaving it, nothing from a room before its
//!   join confirmation — switching rooms is atomic for delivery

use std::{collections::HashSet, time::Duration};

use convene_proto::{ClientSignal, MessageId, RoomId, ServerSignal};

use crate::event::{SessionAction, SessionEvent};

/// Default first reconnect delay.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Default cap on a single backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default reconnect attempt budget per connection loss.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No room open.
    Disconnected,
    /// Join signal sent, waiting for confirmation.
    Connecting,
    /// Joined; deliveries flow.
    Connected,
    /// Channel dropped; waiting out a backoff delay.
    Reconnecting,
}

/// Reconnect tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First backoff delay; doubles per attempt.
    pub base_backoff: Duration,
    /// Cap on a single delay.
    pub max_backoff: Duration,
    /// Attempts before surfacing `ConnectionLost`.
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SessionConfig {
    /// Delay before the given attempt (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_backoff`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let doubled = self
            .base_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
        doubled.min(self.max_backoff)
    }
}

/// Per-client session state machine.
#[derive(Debug, Clone)]
pub struct ChatSession {
    state: SessionState,
    /// The room this session is paired with. `None` when disconnected.
    room: Option<RoomId>,
    /// Message ids delivered on the current connection.
    delivered: HashSet<MessageId>,
    /// Reconnect attempts consumed since the last stable connection.
    attempts: u32,
    config: SessionConfig,
}

impl ChatSession {
    /// Create a disconnected session.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: SessionState::Disconnected,
            room: None,
            delivered: HashSet::new(),
            attempts: 0,
            config,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The paired room. `None` when disconnected.
    #[must_use]
    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    /// Reconnect attempts consumed since the last stable connection.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Process an event and return the actions to execute.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Open { room_id } => self.handle_open(room_id),
            SessionEvent::Close => self.handle_close(),
            SessionEvent::Signal(signal) => self.handle_signal(signal),
            SessionEvent::TransportFailed => self.handle_transport_failed(),
            SessionEvent::ChannelRestored => self.handle_channel_restored(),
        }
    }

    fn handle_open(&mut self, room_id: RoomId) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        // Leaving the previous room first makes the switch atomic for
        // delivery: the dedup set and room filter change together, so a
        // straggler from the old room can never surface after this point.
        if let Some(old) = self.room.take() {
            if self.state != SessionState::Disconnected {
                actions.push(SessionAction::Send(ClientSignal::Leave { room_id: old }));
            }
        }

        self.room = Some(room_id);
        self.delivered.clear();
        self.attempts = 0;
        self.state = SessionState::Connecting;
        actions.push(SessionAction::Send(ClientSignal::Join { room_id }));

        actions
    }

    fn handle_close(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if let Some(room_id) = self.room.take() {
            if self.state != SessionState::Disconnected {
                actions.push(SessionAction::Send(ClientSignal::Leave { room_id }));
            }
        }

        self.state = SessionState::Disconnected;
        self.delivered.clear();
        self.attempts = 0;

        actions
    }

    fn handle_signal(&mut self, signal: ServerSignal) -> Vec<SessionAction> {
        // Signals for any room but the current pairing are stragglers from a
        // previous pairing; drop them regardless of kind.
        if self.room != Some(signal.room_id()) {
            return Vec::new();
        }

        match signal {
            ServerSignal::Joined { room_id } => {
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Connected;
                    self.attempts = 0;
                    vec![SessionAction::FetchHistory { room_id }]
                } else {
                    Vec::new()
                }
            },
            ServerSignal::Deliver { message, .. } => {
                if self.state == SessionState::Connected && self.delivered.insert(message.id) {
                    vec![SessionAction::Deliver(message)]
                } else {
                    // Pre-join, post-leave, or already delivered on this
                    // connection.
                    Vec::new()
                }
            },
            ServerSignal::Left { .. } => Vec::new(),
            ServerSignal::Denied { room_id, reason } => {
                self.room = None;
                self.state = SessionState::Disconnected;
                self.delivered.clear();
                vec![SessionAction::AccessDenied { room_id, reason }]
            },
        }
    }

    fn handle_transport_failed(&mut self) -> Vec<SessionAction> {
        let Some(room_id) = self.room else {
            return Vec::new();
        };
        if self.state == SessionState::Disconnected {
            return Vec::new();
        }

        self.attempts += 1;
        if self.attempts > self.config.max_attempts {
            let attempts = self.attempts - 1;
            self.room = None;
            self.state = SessionState::Disconnected;
            self.delivered.clear();
            self.attempts = 0;
            return vec![SessionAction::ConnectionLost { room_id, attempts }];
        }

        self.state = SessionState::Reconnecting;
        vec![SessionAction::Reconnect {
            room_id,
            delay: self.config.backoff_delay(self.attempts),
        }]
    }

    fn handle_channel_restored(&mut self) -> Vec<SessionAction> {
        let Some(room_id) = self.room else {
            return Vec::new();
        };
        if self.state != SessionState::Reconnecting {
            return Vec::new();
        }

        self.state = SessionState::Connecting;
        self.delivered.clear();
        vec![SessionAction::Send(ClientSignal::Join { room_id })]
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
