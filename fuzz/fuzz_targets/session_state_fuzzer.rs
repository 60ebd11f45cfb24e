//! Fuzz target for the chat session state machine.
//!
//! Arbitrary event sequences must never panic, never deliver a message for
//! a room other than the current pairing, and never deliver the same id
//! twice within one connection.

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use convene_client::{ChatSession, SessionAction, SessionEvent, SessionState};
use convene_proto::{MessageRecord, ServerSignal};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Open { room: u8 },
    Close,
    Joined { room: u8 },
    Left { room: u8 },
    Deliver { room: u8, id: u8 },
    Denied { room: u8 },
    TransportFailed,
    ChannelRestored,
}

fn deliver(room: u8, id: u8) -> ServerSignal {
    ServerSignal::Deliver {
        room_id: u128::from(room),
        message: MessageRecord {
            id: u128::from(id),
            room_id: u128::from(room),
            sender_id: 1,
            text: String::new(),
            created_at_ms: u64::from(id),
            correlation: 0,
        },
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = ChatSession::default();
    let mut delivered: HashSet<(u64, u128)> = HashSet::new();
    let mut generation: u64 = 0;

    for op in ops {
        let event = match op {
            Op::Open { room } => {
                generation += 1;
                SessionEvent::Open { room_id: u128::from(room) }
            },
            Op::Close => SessionEvent::Close,
            Op::Joined { room } => {
                SessionEvent::Signal(ServerSignal::Joined { room_id: u128::from(room) })
            },
            Op::Left { room } => {
                SessionEvent::Signal(ServerSignal::Left { room_id: u128::from(room) })
            },
            Op::Deliver { room, id } => SessionEvent::Signal(deliver(room, id)),
            Op::Denied { room } => SessionEvent::Signal(ServerSignal::Denied {
                room_id: u128::from(room),
                reason: String::new(),
            }),
            Op::TransportFailed => SessionEvent::TransportFailed,
            Op::ChannelRestored => {
                generation += 1;
                SessionEvent::ChannelRestored
            },
        };

        let room_before = session.room();
        for action in session.handle(event) {
            if let SessionAction::Deliver(message) = action {
                assert_eq!(Some(message.room_id), room_before, "delivery for a stale room");
                assert_eq!(session.state(), SessionState::Connected);
                assert!(
                    delivered.insert((generation, message.id)),
                    "duplicate delivery within one connection"
                );
            }
        }
    }
});
