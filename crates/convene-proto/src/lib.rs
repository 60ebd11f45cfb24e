//! Wire contracts for the convene collaboration protocol.
//!
//! Defines the persistent records (events, participants, rooms, messages),
//! the live-channel signals exchanged over a room connection, and the CBOR
//! codecs for both. The store and the channel transport move these types;
//! all behavior lives in `convene-core` and `convene-client`.
//!
//! Payloads use CBOR because it's self-describing (field names embedded),
//! compact, and doesn't need code generation. Routing never requires
//! deserializing a record; only endpoints decode.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod ids;
mod record;
mod signal;

pub use errors::ProtocolError;
pub use ids::{CorrelationToken, EventId, MessageId, RoomId, UserId};
pub use record::{
    EventRecord, MessageRecord, NotificationKind, NotificationRecord, ParticipantRecord, Role,
    RoomRecord, RsvpStatus, UserRecord, timeline_cmp,
};
pub use signal::{ClientSignal, ServerSignal};
