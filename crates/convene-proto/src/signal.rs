//! Live-channel signals.
//!
//! A session holds one bidirectional channel to the server. Client signals
//! flow out (join/leave a room's broadcast group, publish a message); server
//! signals flow in (join confirmations, sequenced message deliveries,
//! denials). Every signal is keyed by room id so a client switching rooms can
//! discard stragglers from the room it left.
//!
//! Authentication is carried by the bearer credential attached when the
//! channel is opened, not by individual signals.

use bytes::Bytes;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{errors::ProtocolError, ids::RoomId, record::MessageRecord};

/// Signals sent from a client session to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientSignal {
    /// Register membership in a room's broadcast group.
    Join {
        /// Room to join.
        room_id: RoomId,
    },

    /// Deregister membership in a room's broadcast group.
    Leave {
        /// Room to leave.
        room_id: RoomId,
    },

    /// Broadcast an already-persisted message to the room.
    ///
    /// Persistence happens first through the store's append call, which
    /// assigns the authoritative id and timestamp; the confirmed record is
    /// then published so every member (sender included) receives the same
    /// bytes. The correlation token rides inside the record.
    Publish {
        /// Target room.
        room_id: RoomId,
        /// The confirmed record to broadcast.
        message: MessageRecord,
    },
}

/// Signals sent from the server to a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerSignal {
    /// Join completed; deliveries for this room follow.
    Joined {
        /// Room the join was for.
        room_id: RoomId,
    },

    /// Leave acknowledged; no further deliveries for this room.
    Left {
        /// Room the leave was for.
        room_id: RoomId,
    },

    /// A sequenced message, broadcast to every room member.
    Deliver {
        /// Room the message belongs to.
        room_id: RoomId,
        /// The confirmed record (authoritative id and timestamp).
        message: MessageRecord,
    },

    /// The server refused a signal for this room.
    Denied {
        /// Room the refused signal targeted.
        room_id: RoomId,
        /// Refusal reason.
        reason: String,
    },
}

impl ClientSignal {
    /// The room this signal targets.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Join { room_id } | Self::Leave { room_id } | Self::Publish { room_id, .. } => {
                *room_id
            },
        }
    }

    /// Encode to CBOR bytes.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        encode_cbor(self)
    }

    /// Decode from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode_cbor(bytes)
    }
}

impl ServerSignal {
    /// The room this signal concerns.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        match self {
            Self::Joined { room_id }
            | Self::Left { room_id }
            | Self::Deliver { room_id, .. }
            | Self::Denied { room_id, .. } => *room_id,
        }
    }

    /// Encode to CBOR bytes.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        encode_cbor(self)
    }

    /// Decode from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode_cbor(bytes)
    }
}

fn encode_cbor<T: Serialize>(value: &T) -> Result<Bytes, ProtocolError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(Bytes::from(buf))
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    ciborium::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_round_trips_the_record() {
        let signal = ClientSignal::Publish {
            room_id: 7,
            message: MessageRecord {
                id: 4,
                room_id: 7,
                sender_id: 2,
                text: "hello".to_string(),
                created_at_ms: 10,
                correlation: 99,
            },
        };
        assert_eq!(signal.room_id(), 7);

        let bytes = signal.encode().expect("encode");
        let decoded = ClientSignal::decode(&bytes).expect("decode");
        assert_eq!(decoded, signal);
    }

    #[test]
    fn deliver_round_trips_the_record() {
        let signal = ServerSignal::Deliver {
            room_id: 3,
            message: MessageRecord {
                id: 11,
                room_id: 3,
                sender_id: 42,
                text: "hi".to_string(),
                created_at_ms: 1_000,
                correlation: 5,
            },
        };

        let bytes = signal.encode().expect("encode");
        assert_eq!(ServerSignal::decode(&bytes).expect("decode"), signal);
    }

    #[test]
    fn truncated_bytes_are_a_decode_error() {
        let bytes = ClientSignal::Join { room_id: 1 }.encode().expect("encode");
        let result = ClientSignal::decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn client_bytes_do_not_decode_as_server_signal() {
        let bytes = ClientSignal::Leave { room_id: 1 }.encode().expect("encode");
        assert!(ServerSignal::decode(&bytes).is_err());
    }
}
