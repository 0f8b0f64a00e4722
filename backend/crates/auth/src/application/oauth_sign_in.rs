//! OAuth Sign In Use Case
//!
//! Drives the provider redirect round trip: issue state, then on callback
//! consume it, fetch the profile, resolve the local user and issue tokens.

use std::sync::Arc;

use chrono::Utc;

use crate::application::oauth_resolve::OAuthResolver;
use crate::application::oauth_state::OAuthStateStore;
use crate::application::token::{IssuedToken, TokenService};
use crate::domain::entity::user::User;
use crate::domain::oauth::OAuthProvider;
use crate::domain::repository::UserRepository;
use crate::error::{AuthError, AuthResult, FieldIssue};

pub struct OAuthSignInOutput {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
    pub user: User,
}

pub struct OAuthSignInUseCase<U, P>
where
    U: UserRepository,
    P: OAuthProvider,
{
    user_repo: Arc<U>,
    provider: Arc<P>,
    states: Arc<OAuthStateStore>,
    tokens: Arc<TokenService>,
}

impl<U, P> OAuthSignInUseCase<U, P>
where
    U: UserRepository,
    P: OAuthProvider,
{
    pub fn new(
        user_repo: Arc<U>,
        provider: Arc<P>,
        states: Arc<OAuthStateStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            user_repo,
            provider,
            states,
            tokens,
        }
    }

    /// Authorization URL to redirect the browser to
    pub fn begin(&self) -> AuthResult<String> {
        let state = self.states.issue();
        self.provider.authorization_url(&state)
    }

    pub async fn complete(
        &self,
        code: Option<&str>,
        state: Option<&str>,
    ) -> AuthResult<OAuthSignInOutput> {
        let state_ok = state.is_some_and(|s| self.states.take(s));
        if !state_ok {
            return Err(AuthError::OAuthStateInvalid);
        }

        let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
            AuthError::invalid_fields(vec![FieldIssue::new(
                "code",
                "Authorization code is required",
            )])
        })?;

        let provider = self.provider.provider();
        let profile = self.provider.fetch_profile(code).await?;

        let mut user = OAuthResolver::new(self.user_repo.clone())
            .resolve(provider, profile)
            .await?;

        let now = Utc::now();
        self.user_repo.record_login(&user.user_id, now).await?;
        user.record_login(now);

        let access_token = self.tokens.issue_access(&user.user_id, &user.email)?;
        let refresh_token = self.tokens.issue_refresh(&user.user_id, &user.email)?;

        tracing::info!(user_id = %user.user_id, provider = %provider, "User logged in via OAuth");
        Ok(OAuthSignInOutput {
            access_token,
            refresh_token,
            user,
        })
    }
}
