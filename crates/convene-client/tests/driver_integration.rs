//! End-to-end driver tests against an in-memory store and a hub transport.
//!
//! The hub models the server side of the live channel: it tracks room
//! membership per connection, confirms joins, and broadcasts published
//! records to every member — including the sender, which exercises echo
//! deduplication.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use convene_client::{
    ClientError, SessionConfig, SessionState,
    driver::{ChannelPair, ChannelTransport, INBOUND_QUEUE_DEPTH, RoomDriver, TransportError},
};
use convene_core::{
    Environment, MemoryStore, MemorySink, InviteWorkflow, SessionIdentity,
    identity::BearerToken,
};
use convene_proto::{ClientSignal, EventRecord, Role, RoomId, RsvpStatus, ServerSignal, UserRecord};
use tokio::sync::mpsc;

const EVENT: u128 = 0xE7;
const ORGANIZER: u64 = 100;

// --- test environment -------------------------------------------------------

#[derive(Clone)]
struct TestEnv {
    counter: Arc<AtomicU64>,
}

impl TestEnv {
    fn new() -> Self {
        Self { counter: Arc::new(AtomicU64::new(1)) }
    }
}

impl Environment for TestEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    // Backoff sleeps complete immediately so reconnect tests run fast.
    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        for (idx, chunk) in buffer.chunks_mut(8).enumerate() {
            let v = n.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(idx as u64);
            for (i, b) in chunk.iter_mut().enumerate() {
                *b = v.to_be_bytes()[i];
            }
        }
    }
}

// --- hub transport -----------------------------------------------------------

#[derive(Default)]
struct HubInner {
    members: HashMap<RoomId, Vec<mpsc::Sender<ServerSignal>>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

/// In-process stand-in for the server end of the live channel.
#[derive(Clone, Default)]
struct HubTransport {
    inner: Arc<Mutex<HubInner>>,
    fail_connects: Arc<AtomicU32>,
}

impl HubTransport {
    fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` connect attempts fail.
    fn fail_next_connects(&self, n: u32) {
        self.fail_connects.store(n, Ordering::SeqCst);
    }

    /// Drop every live connection (clients observe a closed channel).
    fn kill_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        for task in inner.tasks.drain(..) {
            task.abort();
        }
        inner.members.clear();
    }
}

#[async_trait]
impl ChannelTransport for HubTransport {
    async fn connect(&self, _token: &BearerToken) -> Result<ChannelPair, TransportError> {
        let remaining = self.fail_connects.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_connects.store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::Connection("simulated outage".to_string()));
        }

        let (out_tx, mut out_rx) = mpsc::channel::<ClientSignal>(INBOUND_QUEUE_DEPTH);
        let (in_tx, in_rx) = mpsc::channel::<ServerSignal>(INBOUND_QUEUE_DEPTH);

        let hub = self.inner.clone();
        let task = tokio::spawn(async move {
            while let Some(signal) = out_rx.recv().await {
                match signal {
                    ClientSignal::Join { room_id } => {
                        hub.lock()
                            .unwrap()
                            .members
                            .entry(room_id)
                            .or_default()
                            .push(in_tx.clone());
                        let _ = in_tx.send(ServerSignal::Joined { room_id }).await;
                    },
                    ClientSignal::Leave { room_id } => {
                        hub.lock()
                            .unwrap()
                            .members
                            .entry(room_id)
                            .or_default()
                            .retain(|s| !s.same_channel(&in_tx));
                        let _ = in_tx.send(ServerSignal::Left { room_id }).await;
                    },
                    ClientSignal::Publish { room_id, message } => {
                        // Collect under the lock, send outside it.
                        let members = hub
                            .lock()
                            .unwrap()
                            .members
                            .get(&room_id)
                            .cloned()
                            .unwrap_or_default();
                        for member in members {
                            let _ = member
                                .send(ServerSignal::Deliver {
                                    room_id,
                                    message: message.clone(),
                                })
                                .await;
                        }
                    },
                }
            }
        });
        self.inner.lock().unwrap().tasks.push(task);

        Ok(ChannelPair { outbound: out_tx, inbound: in_rx })
    }
}

// --- fixtures ---------------------------------------------------------------

fn identity(user_id: u64) -> SessionIdentity {
    SessionIdentity::new(user_id, Role::Member, format!("token-{user_id}"))
}

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.seed_event(EventRecord {
        event_id: EVENT,
        title: "Sync".to_string(),
        description: String::new(),
        starts_at_ms: 0,
        ends_at_ms: 0,
        location: String::new(),
        attachments: vec![],
        organizer: ORGANIZER,
    });
    for id in [ORGANIZER, 1, 2] {
        store.seed_user(UserRecord { user_id: id, name: format!("user-{id}") });
    }

    // Organizer invites A (1) and B (2); A accepts, B never responds.
    let workflow = InviteWorkflow::new(store.clone(), MemorySink::new());
    workflow.invite(&identity(ORGANIZER), EVENT, &[1, 2]).await.unwrap();
    workflow.rsvp(&identity(1), EVENT, RsvpStatus::Accepted).await.unwrap();

    store
}

fn driver(
    user_id: u64,
    store: &MemoryStore,
    hub: &HubTransport,
) -> RoomDriver<MemoryStore, HubTransport, TestEnv> {
    RoomDriver::new(identity(user_id), store.clone(), hub.clone(), TestEnv::new())
}

fn timeline_texts(driver: &RoomDriver<MemoryStore, HubTransport, TestEnv>) -> Vec<String> {
    driver.timeline().entries().iter().map(|e| e.message.text.clone()).collect()
}

// --- tests ------------------------------------------------------------------

#[tokio::test]
async fn open_joins_and_replays_existing_history() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    let mut alice = driver(1, &store, &hub);
    let room = alice.open(EVENT).await.unwrap();
    alice.send("first").await.unwrap();
    alice.close().await;

    // A fresh session sees the persisted history after joining.
    let mut again = driver(1, &store, &hub);
    let same_room = again.open(EVENT).await.unwrap();
    assert_eq!(room, same_room);
    assert_eq!(timeline_texts(&again), vec!["first"]);
    assert_eq!(again.state(), SessionState::Connected);
}

#[tokio::test]
async fn send_reconciles_optimistic_entry_with_broadcast_echo() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    let mut alice = driver(1, &store, &hub);
    alice.open(EVENT).await.unwrap();

    let record = alice.send("hi").await.unwrap();
    assert_eq!(timeline_texts(&alice), vec!["hi"]);

    // The hub echoes the publish back to the sender; still one entry.
    alice.pump_one().await.unwrap();
    assert_eq!(alice.timeline().len(), 1);
    assert_eq!(alice.timeline().entries()[0].message.id, record.id);
}

#[tokio::test]
async fn invited_but_unaccepted_user_is_denied() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    // B was invited but never accepted.
    let mut bob = driver(2, &store, &hub);
    let result = bob.open(EVENT).await;
    assert!(matches!(
        result,
        Err(ClientError::Core(convene_core::CoreError::Authorization { .. }))
    ));
    assert_eq!(bob.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn two_clients_agree_on_message_order() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    let mut organizer = driver(ORGANIZER, &store, &hub);
    let mut alice = driver(1, &store, &hub);
    organizer.open(EVENT).await.unwrap();
    alice.open(EVENT).await.unwrap();

    alice.send("one").await.unwrap();
    alice.send("two").await.unwrap();

    // Organizer receives both broadcasts; Alice her two echoes.
    organizer.pump_one().await.unwrap();
    organizer.pump_one().await.unwrap();
    alice.pump_one().await.unwrap();
    alice.pump_one().await.unwrap();

    assert_eq!(timeline_texts(&organizer), vec!["one", "two"]);
    assert_eq!(timeline_texts(&organizer), timeline_texts(&alice));
}

#[tokio::test]
async fn reconnect_replays_history_without_duplicates() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    let mut alice = driver(1, &store, &hub);
    alice.open(EVENT).await.unwrap();
    alice.send("before the drop").await.unwrap();
    alice.pump_one().await.unwrap(); // echo, deduplicated

    hub.kill_all();

    // One pump rides the whole reconnect: failure, backoff, rejoin, replay.
    alice.pump_one().await.unwrap();
    assert_eq!(alice.state(), SessionState::Connected);
    assert_eq!(timeline_texts(&alice), vec!["before the drop"]);

    // The session keeps working after the rejoin.
    alice.send("after the drop").await.unwrap();
    assert_eq!(timeline_texts(&alice), vec!["before the drop", "after the drop"]);
}

#[tokio::test]
async fn exhausted_backoff_surfaces_connection_lost() {
    let store = seeded_store().await;
    let hub = HubTransport::new();

    let config = SessionConfig {
        base_backoff: Duration::from_millis(1),
        max_attempts: 3,
        ..SessionConfig::default()
    };
    let mut alice = RoomDriver::with_config(
        identity(1),
        store.clone(),
        hub.clone(),
        TestEnv::new(),
        config,
    );
    alice.open(EVENT).await.unwrap();

    hub.kill_all();
    hub.fail_next_connects(u32::MAX);

    let result = alice.pump_one().await;
    match result {
        Err(err) => {
            assert!(matches!(err, ClientError::ConnectionLost { attempts: 3 }));
            assert!(err.is_reopenable());
        },
        Ok(()) => panic!("expected ConnectionLost"),
    }
    assert_eq!(alice.state(), SessionState::Disconnected);

    // A fresh open gets a new attempt budget and succeeds once the outage
    // clears.
    hub.fail_next_connects(0);
    alice.open(EVENT).await.unwrap();
    assert_eq!(alice.state(), SessionState::Connected);
}

#[tokio::test]
async fn switching_events_leaves_the_old_room() {
    let store = seeded_store().await;
    store.seed_event(EventRecord {
        event_id: 0xE8,
        title: "Retro".to_string(),
        description: String::new(),
        starts_at_ms: 0,
        ends_at_ms: 0,
        location: String::new(),
        attachments: vec![],
        organizer: ORGANIZER,
    });
    let hub = HubTransport::new();

    let workflow = InviteWorkflow::new(store.clone(), MemorySink::new());
    workflow.invite(&identity(ORGANIZER), 0xE8, &[1]).await.unwrap();
    workflow.rsvp(&identity(1), 0xE8, RsvpStatus::Accepted).await.unwrap();

    let mut alice = driver(1, &store, &hub);
    let first_room = alice.open(EVENT).await.unwrap();
    alice.send("in the first room").await.unwrap();

    let second_room = alice.open(0xE8).await.unwrap();
    assert_ne!(first_room, second_room);
    assert_eq!(alice.room(), Some(second_room));
    // The new room's timeline starts from its own (empty) history.
    assert!(alice.timeline().is_empty());

    // The hub no longer lists the old connection in the first room.
    let members = hub.inner.lock().unwrap().members.get(&first_room).cloned().unwrap_or_default();
    assert!(members.is_empty());
}
