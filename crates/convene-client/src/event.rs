//! Session events and actions.

use std::time::Duration;

use convene_proto::{ClientSignal, MessageRecord, RoomId, ServerSignal};

/// Events the driver feeds into the session state machine.
///
/// The driver is responsible for receiving signals from the channel,
/// reporting transport failures, and forwarding application intents.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Application wants this room open (switching away from any current
    /// room atomically with respect to delivery).
    Open {
        /// Room to open.
        room_id: RoomId,
    },

    /// Application wants the current room closed. Safe in any state.
    Close,

    /// A signal arrived on the live channel.
    Signal(ServerSignal),

    /// The transport dropped the channel.
    TransportFailed,

    /// The driver re-established the channel after a `Reconnect` action.
    ChannelRestored,
}

/// Actions the session produces for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Send a signal on the live channel.
    Send(ClientSignal),

    /// Load the room's history and merge it into the timeline.
    ///
    /// Emitted on every successful join, including rejoins, so messages
    /// missed while offline are replayed through the reconciler.
    FetchHistory {
        /// Room whose history to load.
        room_id: RoomId,
    },

    /// Hand a message to the timeline. Emitted at most once per message id
    /// within one connection.
    Deliver(MessageRecord),

    /// Sleep `delay`, re-establish the channel, then feed
    /// [`SessionEvent::ChannelRestored`] (or [`SessionEvent::TransportFailed`]
    /// if the connect fails again).
    Reconnect {
        /// Room the reconnect is for.
        room_id: RoomId,
        /// Backoff delay before the attempt.
        delay: Duration,
    },

    /// Backoff exhausted; the session is disconnected and stays so until the
    /// application reopens.
    ConnectionLost {
        /// Room that was lost.
        room_id: RoomId,
        /// Attempts consumed.
        attempts: u32,
    },

    /// The server refused membership in the room.
    AccessDenied {
        /// Room that was refused.
        room_id: RoomId,
        /// Server-provided reason.
        reason: String,
    },
}
