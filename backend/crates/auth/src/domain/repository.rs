//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.
//! Every mutation is a single atomic statement against one record.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    credentials::StoredCredentials, revoked_token::RevokedToken, user::User,
};
use crate::domain::value_object::{
    email::Email, federation::FederationProvider, totp_secret::TotpSecret, user_id::UserId,
    user_password::UserPassword,
};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user
    ///
    /// Fails with `AuthError::EmailTaken` when the email is already stored.
    async fn create(&self, user: &User, password: Option<&UserPassword>) -> AuthResult<()>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Find user by email, including the password hash
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> AuthResult<Option<StoredCredentials>>;

    /// Find user by a provider's external id
    async fn find_by_federated_id(
        &self,
        provider: FederationProvider,
        external_id: &str,
    ) -> AuthResult<Option<User>>;

    /// Find the user holding an unexpired verification token digest
    async fn find_by_verification_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>>;

    /// Check if email exists
    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool>;

    /// Set email verified and clear the pending token in one update
    async fn mark_email_verified(&self, user_id: &UserId) -> AuthResult<()>;

    /// Attach a provider id, mark the email verified and backfill the avatar
    async fn link_federated_id(
        &self,
        user_id: &UserId,
        provider: FederationProvider,
        external_id: &str,
        avatar: Option<&str>,
    ) -> AuthResult<()>;

    /// Record successful login time; `UserNotFound` if the user is gone
    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()>;

    /// Set (Some) or clear (None) the two-factor secret and flag together
    async fn set_two_factor(
        &self,
        user_id: &UserId,
        secret: Option<&TotpSecret>,
    ) -> AuthResult<()>;
}

/// Revoked token store trait
#[trait_variant::make(RevokedTokenRepository: Send)]
pub trait LocalRevokedTokenRepository {
    /// Record a revocation; revoking the same token again is a no-op
    async fn revoke(&self, entry: &RevokedToken) -> AuthResult<()>;

    /// Whether the token has been revoked
    async fn is_revoked(&self, token: &str) -> AuthResult<bool>;

    /// Delete entries that expired before `now`
    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}
