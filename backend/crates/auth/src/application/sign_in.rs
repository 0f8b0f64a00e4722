//! Sign In Use Case
//!
//! Rate limit, credentials, email verification, second factor, then the
//! login timestamp and token issuance. Each step gates the next.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use platform::rate_limit::RateLimitStore;

use crate::application::config::AuthConfig;
use crate::application::credentials::CredentialVerifier;
use crate::application::token::{IssuedToken, TokenService};
use crate::application::two_factor;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::{AuthError, AuthResult, FieldIssue};

/// Sign in input
#[derive(Debug, Default)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
    /// TOTP code (if 2FA is enabled)
    pub two_factor_code: Option<String>,
    /// Client address used for rate limiting
    pub client_ip: Option<IpAddr>,
}

/// Sign in output
pub struct SignInOutput {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
    pub user: User,
}

/// Rate limit key: one bucket per client address and email
pub fn rate_limit_key(client_ip: Option<IpAddr>, email: &str) -> String {
    let ip = client_ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());
    format!("login:{}:{}", ip, email.trim().to_lowercase())
}

/// Sign in use case
pub struct SignInUseCase<U, L>
where
    U: UserRepository,
    L: RateLimitStore,
{
    user_repo: Arc<U>,
    limiter: Arc<L>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<U, L> SignInUseCase<U, L>
where
    U: UserRepository,
    L: RateLimitStore,
{
    pub fn new(
        user_repo: Arc<U>,
        limiter: Arc<L>,
        tokens: Arc<TokenService>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            limiter,
            tokens,
            config,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        let mut issues = Vec::new();
        if input.email.trim().is_empty() {
            issues.push(FieldIssue::new("email", "Email is required"));
        }
        if input.password.is_empty() {
            issues.push(FieldIssue::new("password", "Password is required"));
        }
        if !issues.is_empty() {
            return Err(AuthError::invalid_fields(issues));
        }

        let key = rate_limit_key(input.client_ip, &input.email);
        match self
            .limiter
            .check_and_increment(&key, &self.config.login_rate_limit)
            .await
        {
            Ok(result) if !result.allowed => return Err(AuthError::TooManyAttempts),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Login rate limiter unavailable"),
        }

        let mut user = CredentialVerifier::new(self.user_repo.clone(), self.config.clone())
            .verify(&input.email, input.password)
            .await?;

        if !user.email_verified {
            return Err(AuthError::EmailNotVerified);
        }

        two_factor::challenge(&user.two_factor, input.two_factor_code.as_deref())?;

        let now = Utc::now();
        self.user_repo.record_login(&user.user_id, now).await?;
        user.record_login(now);

        let access_token = self.tokens.issue_access(&user.user_id, &user.email)?;
        let refresh_token = self.tokens.issue_refresh(&user.user_id, &user.email)?;

        if let Err(e) = self.limiter.reset(&key).await {
            tracing::warn!(error = %e, "Failed to reset login rate limit");
        }

        tracing::info!(user_id = %user.user_id, "User logged in");
        Ok(SignInOutput {
            access_token,
            refresh_token,
            user,
        })
    }
}
