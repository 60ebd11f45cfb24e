//! End-to-end collaboration scenario against the in-memory store.
//!
//! Organizer invites A and B; the room is provisioned; A accepts and posts;
//! B, still invited-only, is denied; concurrent invites and room accesses
//! converge on single records.

use convene_core::{
    CoreError, InviteWorkflow, MemorySink, MemoryStore, MessageGateway, ParticipantRegistry,
    RoomRegistry, SessionIdentity,
};
use convene_proto::{EventRecord, Role, RsvpStatus, UserRecord};

const EVENT: u128 = 0xE1;
const ORGANIZER: u64 = 100;

fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed_event(EventRecord {
        event_id: EVENT,
        title: "Quarterly Review".to_string(),
        description: "Numbers and snacks".to_string(),
        starts_at_ms: 1_000,
        ends_at_ms: 5_000,
        location: "HQ".to_string(),
        attachments: vec!["agenda.pdf".to_string()],
        organizer: ORGANIZER,
    });
    for id in [ORGANIZER, 1, 2, 3] {
        store.seed_user(UserRecord { user_id: id, name: format!("user-{id}") });
    }
    store
}

fn identity(user_id: u64) -> SessionIdentity {
    SessionIdentity::new(user_id, Role::Member, format!("token-{user_id}"))
}

#[tokio::test]
async fn invite_accept_post_deny_scenario() {
    let store = seeded_store();
    let sink = MemorySink::new();
    let workflow = InviteWorkflow::new(store.clone(), sink.clone());
    let gateway = MessageGateway::new(store.clone());

    let organizer = identity(ORGANIZER);
    let user_a = identity(1);
    let user_b = identity(2);

    // Organizer invites A and B; the room appears with the invite.
    let outcome = workflow.invite(&organizer, EVENT, &[1, 2]).await.unwrap();
    assert_eq!(outcome.invited, vec![1, 2]);
    let room = outcome.room.expect("room provisioned on first invite");
    assert_eq!(room.name, "Quarterly Review Chat");

    // A accepts and can post.
    workflow.rsvp(&user_a, EVENT, RsvpStatus::Accepted).await.unwrap();
    let sent = gateway.post(&user_a, EVENT, "hi", 42).await.unwrap();
    assert_eq!(sent.sender_id, 1);
    assert_eq!(sent.correlation, 42);

    // B has not responded: denied both directions, state intact.
    assert!(matches!(
        gateway.history(&user_b, EVENT).await,
        Err(CoreError::Authorization { .. })
    ));
    assert!(matches!(
        gateway.post(&user_b, EVENT, "let me in", 1).await,
        Err(CoreError::Authorization { .. })
    ));
    let history = gateway.history(&user_a, EVENT).await.unwrap();
    assert_eq!(history.len(), 1);

    // Organizer reads without being a participant record.
    assert_eq!(gateway.history(&organizer, EVENT).await.unwrap().len(), 1);
}

#[tokio::test]
async fn overlapping_concurrent_invites_keep_one_record_per_user() {
    let store = seeded_store();
    let organizer = identity(ORGANIZER);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let registry = ParticipantRegistry::new(store.clone());
        let caller = organizer.clone();
        handles.push(tokio::spawn(async move {
            registry.invite(&caller, EVENT, &[1, 2, 3]).await
        }));
    }

    let mut total_added = 0;
    for handle in handles {
        total_added += handle.await.unwrap().unwrap().len();
    }

    // Exactly three additions across all racing calls, one roster entry each.
    assert_eq!(total_added, 3);
    let roster = ParticipantRegistry::new(store).participants(EVENT).await.unwrap();
    assert_eq!(roster.len(), 3);
}

#[tokio::test]
async fn racing_room_accesses_share_one_room() {
    let store = seeded_store();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let rooms = RoomRegistry::new(store.clone());
        handles.push(tokio::spawn(async move {
            rooms
                .get_or_create_room(EVENT, "Quarterly Review", vec![1, 2])
                .await
                .map(|r| r.room_id)
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 1);
    assert_eq!(store.room_count(), 1);
}

#[tokio::test]
async fn surfaced_errors_leave_prior_state_intact() {
    let store = seeded_store();
    let workflow = InviteWorkflow::new(store.clone(), MemorySink::new());
    let organizer = identity(ORGANIZER);

    workflow.invite(&organizer, EVENT, &[1]).await.unwrap();
    let registry = ParticipantRegistry::new(store.clone());
    let before = registry.participants(EVENT).await.unwrap();

    // Unknown event surfaces NotFound without touching the roster.
    assert!(matches!(
        workflow.invite(&organizer, 0xDEAD, &[2]).await,
        Err(CoreError::EventNotFound(_))
    ));

    // RSVP for a user who was never invited surfaces NotFound.
    assert!(matches!(
        workflow.rsvp(&identity(3), EVENT, RsvpStatus::Accepted).await,
        Err(CoreError::ParticipantNotFound { .. })
    ));

    assert_eq!(registry.participants(EVENT).await.unwrap(), before);
}
