//! Token Service
//!
//! Issues and verifies HS256 access and refresh tokens.
//! Each kind has its own secret, so a token of one kind never verifies as
//! the other. Expiry is checked with zero leeway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::value_object::{email::Email, token_kind::TokenKind, user_id::UserId};
use crate::error::TokenError;

/// Signed claim set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two tokens issued in the same second differ
    pub jti: String,
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// A token whose signature, kind and expiry have been checked
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub email: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// Token issuer / verifier
#[derive(Clone)]
pub struct TokenService {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            access: KeyPair {
                encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
                ttl: config.access_ttl,
            },
            refresh: KeyPair {
                encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
                decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
                ttl: config.refresh_ttl,
            },
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue_access(&self, user_id: &UserId, email: &Email) -> Result<IssuedToken, TokenError> {
        self.issue_at(TokenKind::Access, user_id, email, Utc::now())
    }

    pub fn issue_refresh(
        &self,
        user_id: &UserId,
        email: &Email,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(TokenKind::Refresh, user_id, email, Utc::now())
    }

    /// Issue a token as if the clock read `now`
    pub fn issue_at(
        &self,
        kind: TokenKind,
        user_id: &UserId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let expires_at = chrono::Duration::from_std(keys.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| TokenError::Signing(format!("{} token lifetime out of range", kind)))?;

        let claims = TokenClaims {
            sub: user_id.to_string(),
            email: email.as_str().to_string(),
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            kind,
            expires_at,
        })
    }

    /// Verify signature, expiry and kind
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, TokenError> {
        let data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;
        let claims = data.claims;

        if claims.kind != kind {
            return Err(TokenError::Invalid);
        }

        let user_id: UserId = claims.sub.parse().map_err(|_| TokenError::Invalid)?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Invalid)?;

        Ok(VerifiedToken {
            user_id,
            email: claims.email,
            kind: claims.kind,
            expires_at,
        })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::development())
    }

    fn subject() -> (UserId, Email) {
        (UserId::new(), Email::new("ada@example.com").unwrap())
    }

    #[test]
    fn test_access_roundtrip() {
        let tokens = service();
        let (user_id, email) = subject();

        let issued = tokens.issue_access(&user_id, &email).unwrap();
        let verified = tokens.verify(&issued.token, TokenKind::Access).unwrap();

        assert_eq!(verified.user_id, user_id);
        assert_eq!(verified.email, "ada@example.com");
        assert_eq!(verified.kind, TokenKind::Access);
        assert_eq!(verified.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_cross_kind_rejection() {
        let tokens = service();
        let (user_id, email) = subject();

        let access = tokens.issue_access(&user_id, &email).unwrap();
        let refresh = tokens.issue_refresh(&user_id, &email).unwrap();

        assert!(matches!(
            tokens.verify(&access.token, TokenKind::Refresh),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(
            tokens.verify(&refresh.token, TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_kind_claim_checked_even_with_shared_secret() {
        let mut config = AuthConfig::development();
        config.refresh_secret = config.access_secret.clone();
        let tokens = TokenService::new(&config);
        let (user_id, email) = subject();

        let refresh = tokens.issue_refresh(&user_id, &email).unwrap();
        assert!(matches!(
            tokens.verify(&refresh.token, TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_expired_is_distinguished() {
        let tokens = service();
        let (user_id, email) = subject();

        let issued = tokens
            .issue_at(
                TokenKind::Access,
                &user_id,
                &email,
                Utc::now() - chrono::Duration::hours(1),
            )
            .unwrap();

        assert!(matches!(
            tokens.verify(&issued.token, TokenKind::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_tampered_and_foreign_tokens() {
        let tokens = service();
        let (user_id, email) = subject();
        let issued = tokens.issue_access(&user_id, &email).unwrap();

        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert!(matches!(
            tokens.verify(&tampered, TokenKind::Access),
            Err(TokenError::Invalid)
        ));

        let other = service().issue_access(&user_id, &email).unwrap();
        assert!(matches!(
            tokens.verify(&other.token, TokenKind::Access),
            Err(TokenError::Invalid)
        ));

        assert!(matches!(
            tokens.verify("not.a.jwt", TokenKind::Access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = service();
        let (user_id, email) = subject();
        let now = Utc::now();

        let a = tokens.issue_at(TokenKind::Access, &user_id, &email, now).unwrap();
        let b = tokens.issue_at(TokenKind::Access, &user_id, &email, now).unwrap();
        assert_ne!(a.token, b.token);
    }
}
