//! Revoked Token Entity
//!
//! A token that must no longer be honored even though its signature and
//! expiry are still valid. Entries past `expires_at` carry no meaning and
//! may be purged at any time.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{token_kind::TokenKind, user_id::UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedToken {
    /// The raw token string
    pub token: String,
    pub kind: TokenKind,
    /// Owner of the token
    pub user_id: UserId,
    /// Equal to the token's own `exp` claim
    pub expires_at: DateTime<Utc>,
}

impl RevokedToken {
    pub fn new(
        token: impl Into<String>,
        kind: TokenKind,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            kind,
            user_id,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
