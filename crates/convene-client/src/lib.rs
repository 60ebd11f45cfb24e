//! Per-client chat session layer.
//!
//! # Architecture
//!
//! The session follows the same Sans-IO, action-based pattern as
//! `convene-core`. [`ChatSession`] is a pure state machine: it consumes
//! [`SessionEvent`] inputs and produces [`SessionAction`] instructions; the
//! async [`driver::RoomDriver`] executes those instructions against a
//! [`driver::ChannelTransport`] and the store, and owns every suspension
//! point (connect, history fetch, backoff sleeps).
//!
//! The [`Timeline`] reconciler merges three inbound flows — optimistic local
//! sends, server-confirmed echoes, and live broadcasts — into one ordered,
//! duplicate-free view.
//!
//! # Components
//!
//! - [`ChatSession`]: connect/join/leave lifecycle with bounded reconnect
//! - [`Timeline`]: optimistic/confirmed message reconciliation
//! - [`driver::RoomDriver`]: async glue between machine, transport, store

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod driver;
mod error;
mod event;
mod session;
mod timeline;

pub use error::ClientError;
pub use event::{SessionAction, SessionEvent};
pub use session::{ChatSession, SessionConfig, SessionState};
pub use timeline::{Delivery, Timeline, TimelineEntry};
