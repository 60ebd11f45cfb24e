//! Explicit session identity.
//!
//! Every core operation takes the caller's identity as a parameter. There is
//! no ambient authenticated-user state anywhere in this workspace; a caller
//! that wants to act as someone must hold that someone's `SessionIdentity`.

use convene_proto::{Role, UserId};

/// Opaque bearer credential attached to store requests and the live channel.
///
/// The core never inspects the token; enforcement is server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token for attaching to outbound requests.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The authenticated caller of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// The caller's user id.
    pub user_id: UserId,
    /// Directory-level role (`Organizer` is additionally resolved per event;
    /// see [`crate::capability::resolve_role`]).
    pub role: Role,
    /// Bearer credential for outbound calls.
    pub token: BearerToken,
}

impl SessionIdentity {
    /// Convenience constructor.
    #[must_use]
    pub fn new(user_id: UserId, role: Role, token: impl Into<String>) -> Self {
        Self { user_id, role, token: BearerToken::new(token) }
    }
}
