//! In-Memory Repository
//!
//! Process-local store with the same uniqueness and atomicity rules as the
//! PostgreSQL schema. Backs tests and database-less local runs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::error::app_error::AppError;
use tokio::sync::RwLock;

use crate::domain::entity::{
    credentials::StoredCredentials,
    revoked_token::RevokedToken,
    user::{TwoFactor, User},
};
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, federation::FederationProvider, totp_secret::TotpSecret, user_id::UserId,
    user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct Store {
    users: HashMap<UserId, StoredCredentials>,
    revoked: HashMap<String, RevokedToken>,
}

impl Store {
    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<&StoredCredentials> {
        self.users.values().find(|c| pred(&c.user))
    }

    fn user_mut(&mut self, user_id: &UserId) -> AuthResult<&mut User> {
        self.users
            .get_mut(user_id)
            .map(|c| &mut c.user)
            .ok_or(AuthError::UserNotFound)
    }
}

fn duplicate_federated_id(provider: FederationProvider) -> AuthError {
    AuthError::App(AppError::conflict(format!("Duplicate {} id", provider)))
}

/// In-memory auth repository
#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revocation entries currently held
    pub async fn revoked_count(&self) -> usize {
        self.store.read().await.revoked.len()
    }
}

impl UserRepository for InMemoryAuthRepository {
    async fn create(&self, user: &User, password: Option<&UserPassword>) -> AuthResult<()> {
        let mut store = self.store.write().await;

        if store.find(|u| u.email == user.email).is_some() {
            return Err(AuthError::EmailTaken);
        }
        for provider in [FederationProvider::Google, FederationProvider::Apple] {
            if let Some(id) = user.federated_id(provider)
                && store.find(|u| u.federated_id(provider) == Some(id)).is_some()
            {
                return Err(duplicate_federated_id(provider));
            }
        }

        store.users.insert(
            user.user_id,
            StoredCredentials {
                user: user.clone(),
                password_hash: password.cloned(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.get(user_id).map(|c| c.user.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.find(|u| &u.email == email).map(|c| c.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> AuthResult<Option<StoredCredentials>> {
        let store = self.store.read().await;
        Ok(store.find(|u| &u.email == email).cloned())
    }

    async fn find_by_federated_id(
        &self,
        provider: FederationProvider,
        external_id: &str,
    ) -> AuthResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .find(|u| u.federated_id(provider) == Some(external_id))
            .map(|c| c.user.clone()))
    }

    async fn find_by_verification_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store
            .find(|u| {
                u.email_verification
                    .as_ref()
                    .is_some_and(|v| v.token_hash == token_hash && !v.is_expired(now))
            })
            .map(|c| c.user.clone()))
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let store = self.store.read().await;
        Ok(store.find(|u| &u.email == email).is_some())
    }

    async fn mark_email_verified(&self, user_id: &UserId) -> AuthResult<()> {
        let mut store = self.store.write().await;
        store.user_mut(user_id)?.mark_email_verified();
        Ok(())
    }

    async fn link_federated_id(
        &self,
        user_id: &UserId,
        provider: FederationProvider,
        external_id: &str,
        avatar: Option<&str>,
    ) -> AuthResult<()> {
        let mut store = self.store.write().await;

        let taken = store
            .find(|u| u.user_id != *user_id && u.federated_id(provider) == Some(external_id))
            .is_some();
        if taken {
            return Err(duplicate_federated_id(provider));
        }

        store.user_mut(user_id)?.link_federation(
            provider,
            external_id.to_string(),
            avatar.map(str::to_string),
        );
        Ok(())
    }

    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()> {
        let mut store = self.store.write().await;
        store.user_mut(user_id)?.record_login(at);
        Ok(())
    }

    async fn set_two_factor(
        &self,
        user_id: &UserId,
        secret: Option<&TotpSecret>,
    ) -> AuthResult<()> {
        let mut store = self.store.write().await;
        let two_factor = match secret {
            Some(secret) => TwoFactor::Enabled(secret.clone()),
            None => TwoFactor::Disabled,
        };
        store.user_mut(user_id)?.set_two_factor(two_factor);
        Ok(())
    }
}

impl RevokedTokenRepository for InMemoryAuthRepository {
    async fn revoke(&self, entry: &RevokedToken) -> AuthResult<()> {
        let mut store = self.store.write().await;
        store
            .revoked
            .entry(entry.token.clone())
            .or_insert_with(|| entry.clone());
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        let store = self.store.read().await;
        Ok(store.revoked.contains_key(token))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut store = self.store.write().await;
        let before = store.revoked.len();
        store.revoked.retain(|_, entry| !entry.is_expired(now));
        Ok((before - store.revoked.len()) as u64)
    }
}
