//! Verify Email Use Case

use std::sync::Arc;

use chrono::Utc;

use crate::domain::entity::email_verification::EmailVerification;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::user_id::UserId;
use crate::error::{AuthError, AuthResult};

pub struct VerifyEmailUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> VerifyEmailUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    /// Consume a verification token
    pub async fn execute(&self, token: Option<&str>) -> AuthResult<UserId> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::VerificationTokenMissing)?;

        let token_hash = EmailVerification::hash_token(token);
        let user = self
            .user_repo
            .find_by_verification_hash(&token_hash, Utc::now())
            .await?
            .ok_or(AuthError::InvalidVerificationToken)?;

        self.user_repo.mark_email_verified(&user.user_id).await?;

        tracing::info!(user_id = %user.user_id, "Email verified");
        Ok(user.user_id)
    }
}
