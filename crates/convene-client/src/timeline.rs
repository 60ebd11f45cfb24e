//! Timeline reconciliation.
//!
//! Merges three inbound flows into one rendered timeline:
//!
//! 1. optimistic local sends (provisional, pre-persistence),
//! 2. server-confirmed echoes of those sends (authoritative id/timestamp,
//!    matched by the correlation token carried through the round trip),
//! 3. live broadcasts and history replays from everyone else.
//!
//! Invariants: iteration order is always `(created_at, id)` — the one total
//! order every client agrees on — and no logical message is visible twice,
//! whatever the arrival interleaving.

use std::collections::HashSet;

use convene_proto::{CorrelationToken, MessageId, MessageRecord, RoomId, UserId, timeline_cmp};

/// Delivery state of a timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown locally, not yet confirmed by the store.
    Pending,
    /// Server-confirmed.
    Confirmed,
}

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// The record (provisional fields until confirmed).
    pub message: MessageRecord,
    /// Whether the store has confirmed it.
    pub delivery: Delivery,
}

/// Ordered, duplicate-free view of one room's messages.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    /// Ids of confirmed records already present (cross-connection dedup).
    seen: HashSet<MessageId>,
}

impl Timeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in render order.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Number of visible entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a provisional entry for a message the user just sent.
    ///
    /// The provisional timestamp is one past the current tail, which keeps
    /// the entry at the end of the view until the authoritative timestamp
    /// arrives. The caller submits the text for persistence with the same
    /// correlation token.
    pub fn send_optimistic(
        &mut self,
        room_id: RoomId,
        sender_id: UserId,
        text: &str,
        correlation: CorrelationToken,
    ) {
        let provisional_ts = self
            .entries
            .last()
            .map_or(0, |e| e.message.created_at_ms + 1);

        self.entries.push(TimelineEntry {
            message: MessageRecord {
                // Provisional id; replaced wholesale on confirmation and
                // never inserted into `seen`.
                id: 0,
                room_id,
                sender_id,
                text: text.to_string(),
                created_at_ms: provisional_ts,
                correlation,
            },
            delivery: Delivery::Pending,
        });
    }

    /// Reconcile the store's confirmation of an optimistic send.
    ///
    /// Replaces the matching provisional entry in place (then moves it to
    /// its sorted position) rather than appending a duplicate. A confirm
    /// with no matching provisional entry — e.g. the broadcast echo raced
    /// ahead, or the send predates a restart — degrades to [`Self::observe`].
    pub fn confirm(&mut self, record: MessageRecord) {
        let pending = self.entries.iter().position(|e| {
            e.delivery == Delivery::Pending && e.message.correlation == record.correlation
        });

        match pending {
            Some(index) => {
                self.entries.remove(index);
                // The broadcast echo may already have landed under this id;
                // the provisional entry still had to go, but the record must
                // not appear a second time.
                if !self.seen.contains(&record.id) {
                    self.insert_confirmed(record);
                }
            },
            None => self.observe(record),
        }
    }

    /// Merge an inbound confirmed record (broadcast or history replay).
    ///
    /// Duplicates (by id, or by correlation against a still-pending local
    /// entry) collapse to a single visible entry; out-of-order arrivals are
    /// inserted at their sorted position rather than appended.
    pub fn observe(&mut self, record: MessageRecord) {
        if self.seen.contains(&record.id) {
            return;
        }

        // A broadcast echo of our own pending send: reconcile it exactly
        // like a confirmation.
        let pending = self.entries.iter().position(|e| {
            e.delivery == Delivery::Pending && e.message.correlation == record.correlation
        });
        if let Some(index) = pending {
            self.entries.remove(index);
        }

        self.insert_confirmed(record);
    }

    /// Merge a history replay, typically after a reconnect.
    pub fn merge_history(&mut self, records: Vec<MessageRecord>) {
        for record in records {
            self.observe(record);
        }
    }

    /// Drop a provisional entry whose persistence failed.
    ///
    /// Returns `true` if an entry was removed. Confirmed entries are never
    /// touched — a failed resubmit must not erase delivered history.
    pub fn abandon(&mut self, correlation: CorrelationToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| {
            e.delivery != Delivery::Pending || e.message.correlation != correlation
        });
        before != self.entries.len()
    }

    fn insert_confirmed(&mut self, record: MessageRecord) {
        self.seen.insert(record.id);

        let at = self
            .entries
            .partition_point(|e| timeline_cmp(&e.message, &record) != std::cmp::Ordering::Greater);
        self.entries.insert(at, TimelineEntry { message: record, delivery: Delivery::Confirmed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: MessageId, at: u64, correlation: CorrelationToken) -> MessageRecord {
        MessageRecord {
            id,
            room_id: 1,
            sender_id: 9,
            text: format!("m{id}"),
            created_at_ms: at,
            correlation,
        }
    }

    fn texts(timeline: &Timeline) -> Vec<String> {
        timeline.entries().iter().map(|e| e.message.text.clone()).collect()
    }

    #[test]
    fn optimistic_send_then_confirm_is_one_entry() {
        let mut timeline = Timeline::new();
        timeline.send_optimistic(1, 9, "hi", 42);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].delivery, Delivery::Pending);

        timeline.confirm(record(7, 100, 42));
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.entries()[0].delivery, Delivery::Confirmed);
        assert_eq!(timeline.entries()[0].message.id, 7);
    }

    #[test]
    fn broadcast_echo_before_confirmation_still_yields_one_entry() {
        let mut timeline = Timeline::new();
        timeline.send_optimistic(1, 9, "hi", 42);

        // The room broadcast arrives before the submit response...
        timeline.observe(record(7, 100, 42));
        assert_eq!(timeline.len(), 1);

        // ...and the late confirmation is a no-op duplicate.
        timeline.confirm(record(7, 100, 42));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn out_of_order_arrival_inserts_at_sorted_position() {
        let mut timeline = Timeline::new();
        timeline.observe(record(2, 200, 0));
        timeline.observe(record(3, 300, 0));
        // Late arrival with an earlier timestamp.
        timeline.observe(record(1, 100, 0));

        assert_eq!(texts(&timeline), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn equal_timestamps_fall_back_to_id_order() {
        let mut timeline = Timeline::new();
        timeline.observe(record(5, 100, 0));
        timeline.observe(record(4, 100, 0));

        let ids: Vec<_> = timeline.entries().iter().map(|e| e.message.id).collect();
        assert_eq!(ids, vec![4, 5]);
    }

    #[test]
    fn history_replay_after_reconnect_adds_nothing_already_seen() {
        let mut timeline = Timeline::new();
        timeline.observe(record(1, 100, 0));
        timeline.observe(record(2, 200, 0));

        timeline.merge_history(vec![record(1, 100, 0), record(2, 200, 0), record(3, 300, 0)]);

        assert_eq!(texts(&timeline), vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn abandon_removes_only_the_pending_entry() {
        let mut timeline = Timeline::new();
        timeline.observe(record(1, 100, 7));
        timeline.send_optimistic(1, 9, "draft", 8);

        assert!(timeline.abandon(8));
        assert!(!timeline.abandon(8));
        // A correlation shared with a confirmed record never removes it.
        assert!(!timeline.abandon(7));
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn pending_entry_renders_at_the_tail() {
        let mut timeline = Timeline::new();
        timeline.observe(record(1, 100, 0));
        timeline.send_optimistic(1, 9, "draft", 5);
        timeline.observe(record(2, 50, 0));

        assert_eq!(texts(&timeline), vec!["m2", "m1", "draft"]);
    }
}
