//! Protocol-level errors.

use thiserror::Error;

/// Errors produced while encoding or decoding wire payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// CBOR encoding failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// CBOR decoding failed (truncated, malformed, or wrong shape).
    #[error("decode error: {0}")]
    Decode(String),
}
