//! Email Verification
//!
//! Pending proof-of-ownership for a freshly registered email.
//! Only the SHA-256 digest of the token is stored; the clear token is
//! handed to the mailer once and never persisted.

use chrono::{DateTime, Duration, Utc};
use platform::crypto::{random_token_hex, sha256_hex};

/// Random bytes in a verification token (hex-encoded to 64 chars)
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailVerification {
    /// Hex SHA-256 of the clear token
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl EmailVerification {
    /// Issue a new token valid for `ttl`
    ///
    /// Returns the clear token (for the email link) and the storable record.
    pub fn issue(ttl: Duration) -> (String, Self) {
        let token = random_token_hex(TOKEN_BYTES);
        let verification = Self {
            token_hash: Self::hash_token(&token),
            expires_at: Utc::now() + ttl,
        };
        (token, verification)
    }

    /// Digest used to look a submitted token up
    pub fn hash_token(token: &str) -> String {
        sha256_hex(token.as_bytes())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
