//! Identifier types.
//!
//! Identifiers are opaque integers minted by the store (or, for correlation
//! tokens, by the client). They are plain aliases rather than newtypes so
//! they stay trivially copyable through headers, signals, and map keys.

/// Identifier of a scheduled event. 128-bit, store-assigned.
pub type EventId = u128;

/// Identifier of a user. 64-bit, store-assigned.
pub type UserId = u64;

/// Identifier of a discussion room. 128-bit, store-assigned.
pub type RoomId = u128;

/// Identifier of a persisted message. 128-bit, store-assigned.
pub type MessageId = u128;

/// Client-generated token carried through a message's persist round trip.
///
/// The submitting client mints one per outbound message; the server echoes it
/// back on the confirmed record so the client can replace its provisional
/// entry without guessing by sender and content.
pub type CorrelationToken = u128;
