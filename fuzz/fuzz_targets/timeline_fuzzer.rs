//! Fuzz target for timeline reconciliation.
//!
//! Applies arbitrary interleavings of optimistic sends, confirmations,
//! observations, history merges, and abandons, and checks the two rendering
//! invariants after every step: confirmed entries are sorted by
//! `(created_at, id)` and no confirmed id appears twice.

#![no_main]

use arbitrary::Arbitrary;
use convene_client::{Delivery, Timeline};
use convene_proto::{MessageRecord, timeline_cmp};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum TimelineOp {
    Optimistic { correlation: u8 },
    Confirm { correlation: u8, id: u8, at: u8 },
    Observe { id: u8, at: u8 },
    MergeHistory { records: Vec<(u8, u8)> },
    Abandon { correlation: u8 },
}

fn record(id: u8, at: u8, correlation: u8) -> MessageRecord {
    MessageRecord {
        id: u128::from(id),
        room_id: 1,
        sender_id: 2,
        text: format!("m{id}"),
        created_at_ms: u64::from(at),
        correlation: u128::from(correlation),
    }
}

fuzz_target!(|ops: Vec<TimelineOp>| {
    let mut timeline = Timeline::new();

    for op in ops {
        match op {
            TimelineOp::Optimistic { correlation } => {
                timeline.send_optimistic(1, 9, "draft", u128::from(correlation));
            },
            TimelineOp::Confirm { correlation, id, at } => {
                timeline.confirm(record(id, at, correlation));
            },
            TimelineOp::Observe { id, at } => {
                timeline.observe(record(id, at, 0));
            },
            TimelineOp::MergeHistory { records } => {
                timeline.merge_history(
                    records.into_iter().map(|(id, at)| record(id, at, 0)).collect(),
                );
            },
            TimelineOp::Abandon { correlation } => {
                let _ = timeline.abandon(u128::from(correlation));
            },
        }

        let confirmed: Vec<&MessageRecord> = timeline
            .entries()
            .iter()
            .filter(|e| e.delivery == Delivery::Confirmed)
            .map(|e| &e.message)
            .collect();

        for pair in confirmed.windows(2) {
            assert_ne!(
                timeline_cmp(pair[0], pair[1]),
                std::cmp::Ordering::Greater,
                "confirmed entries out of order"
            );
        }

        let mut ids: Vec<u128> = confirmed.iter().map(|m| m.id).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total, "duplicate confirmed id rendered");
    }
});
