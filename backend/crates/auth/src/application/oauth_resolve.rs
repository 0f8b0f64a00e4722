//! OAuth Federation Resolver
//!
//! Maps a provider profile onto a local user: existing link, else link by
//! email, else create. The provider's email claim is trusted as verified.

use std::sync::Arc;

use crate::domain::entity::user::{FederatedProfile, User};
use crate::domain::oauth::OAuthProfile;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, federation::FederationProvider};
use crate::error::{AuthError, AuthResult};

const FALLBACK_FIRST_NAME: &str = "User";

/// Split provider name fields into (first, last)
///
/// Given/family names win; otherwise the display name's first two words.
pub fn split_names(profile: &OAuthProfile) -> (String, String) {
    let given = profile
        .given_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let family = profile
        .family_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut words = profile.display_name.as_deref().unwrap_or("").split_whitespace();
    let display_first = words.next();
    let display_second = words.next();

    let first = given
        .or(display_first)
        .unwrap_or(FALLBACK_FIRST_NAME)
        .to_string();
    let last = family.or(display_second).unwrap_or("").to_string();
    (first, last)
}

pub struct OAuthResolver<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> OAuthResolver<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn resolve(
        &self,
        provider: FederationProvider,
        profile: OAuthProfile,
    ) -> AuthResult<User> {
        if profile.external_id.trim().is_empty() {
            return Err(AuthError::OAuthProvider {
                provider,
                message: "profile is missing an account id".to_string(),
            });
        }

        // 1. Already linked
        if let Some(user) = self
            .user_repo
            .find_by_federated_id(provider, &profile.external_id)
            .await?
        {
            return Ok(user);
        }

        let email = profile
            .email
            .as_deref()
            .and_then(|e| Email::new(e).ok())
            .ok_or_else(|| AuthError::OAuthProvider {
                provider,
                message: "profile has no usable email".to_string(),
            })?;

        // 2. Existing account with the same email
        if let Some(user) = self.link_existing(provider, &email, &profile).await? {
            return Ok(user);
        }

        // 3. New account
        let (first_name, last_name) = split_names(&profile);
        let user = User::new_federated(FederatedProfile {
            provider,
            external_id: profile.external_id.clone(),
            email: email.clone(),
            first_name,
            last_name,
            profile_picture: profile.avatar_url.clone(),
        });

        match self.user_repo.create(&user, None).await {
            Ok(()) => {
                tracing::info!(user_id = %user.user_id, provider = %provider, "Account created from OAuth profile");
                Ok(user)
            }
            // Another request created the email first; link to it instead
            Err(AuthError::EmailTaken) => self
                .link_existing(provider, &email, &profile)
                .await?
                .ok_or(AuthError::EmailTaken),
            Err(e) => Err(e),
        }
    }

    async fn link_existing(
        &self,
        provider: FederationProvider,
        email: &Email,
        profile: &OAuthProfile,
    ) -> AuthResult<Option<User>> {
        let Some(mut user) = self.user_repo.find_by_email(email).await? else {
            return Ok(None);
        };

        self.user_repo
            .link_federated_id(
                &user.user_id,
                provider,
                &profile.external_id,
                profile.avatar_url.as_deref(),
            )
            .await?;
        user.link_federation(
            provider,
            profile.external_id.clone(),
            profile.avatar_url.clone(),
        );

        tracing::info!(user_id = %user.user_id, provider = %provider, "OAuth identity linked to existing account");
        Ok(Some(user))
    }
}
