//! Collaboration core: participant lifecycle, room registry, invite workflow.
//!
//! # Architecture
//!
//! The core follows a Sans-IO split. Transition rules ([`participant`]) and
//! the capability policy ([`capability`]) are pure functions; the registries
//! ([`registry`], [`rooms`]) apply them through the [`store::EventStore`]
//! request/response seam using per-record atomic primitives
//! (insert-if-absent, compare-and-swap, compare-and-create). No lock is held
//! across an await; concurrent sessions race at the store boundary and
//! resolve races by adopting the winning record.
//!
//! Every operation takes the caller's [`identity::SessionIdentity`]
//! explicitly. Nothing reads ambient global state.
//!
//! # Components
//!
//! - [`registry::ParticipantRegistry`]: invite/respond/reject lifecycle
//! - [`rooms::RoomRegistry`]: one room per event, created lazily
//! - [`workflow::InviteWorkflow`]: orchestrates invitations, RSVP, and
//!   notification side effects
//! - [`messages::MessageGateway`]: access-gated history loads and message
//!   persistence
//! - [`store::MemoryStore`]: in-memory store for tests and simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod capability;
pub mod env;
pub mod error;
pub mod identity;
pub mod messages;
pub mod participant;
pub mod registry;
pub mod rooms;
pub mod store;
pub mod workflow;

pub use capability::{Action, resolve_role};
pub use env::{Environment, SystemEnv};
pub use error::CoreError;
pub use identity::{BearerToken, SessionIdentity};
pub use messages::MessageGateway;
pub use registry::ParticipantRegistry;
pub use rooms::RoomRegistry;
pub use store::{EventStore, MemoryStore, StoreError};
pub use workflow::{InviteWorkflow, InviteOutcome, MemorySink, NotificationSink};
