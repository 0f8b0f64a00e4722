//! Credential Verifier
//!
//! Checks an email + password against the stored Argon2id hash.
//! Every failure collapses to `AuthError::InvalidCredentials`.

use std::sync::{Arc, OnceLock};

use crate::application::config::AuthConfig;
use crate::domain::entity::{credentials::StoredCredentials, user::User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

/// Hash compared against when no real hash exists, so that unknown
/// accounts cost the same time as a wrong password.
static DUMMY_HASH: OnceLock<Option<UserPassword>> = OnceLock::new();

fn dummy_hash() -> Option<&'static UserPassword> {
    DUMMY_HASH
        .get_or_init(|| {
            let raw = RawPassword::submitted(platform::crypto::random_token_hex(16));
            UserPassword::from_raw(&raw, None).ok()
        })
        .as_ref()
}

/// Credential verifier
pub struct CredentialVerifier<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
}

impl<U> CredentialVerifier<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self { user_repo, config }
    }

    /// Return the user when the password matches the stored hash
    ///
    /// Does not touch `last_login_at`; the caller records the login once
    /// every later step has passed.
    pub async fn verify(&self, email: &str, password: String) -> AuthResult<User> {
        let raw = RawPassword::submitted(password);

        let stored = match Email::new(email) {
            Ok(email) => self.user_repo.find_credentials_by_email(&email).await?,
            Err(_) => None,
        };

        let (user, hash) = match stored {
            Some(StoredCredentials {
                user,
                password_hash: Some(hash),
            }) => (Some(user), hash),
            _ => match dummy_hash() {
                Some(hash) => (None, hash.clone()),
                None => return Err(AuthError::InvalidCredentials),
            },
        };

        let config = self.config.clone();
        let matched = tokio::task::spawn_blocking(move || hash.verify(&raw, config.pepper()))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?;

        match user {
            Some(user) if matched => Ok(user),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
