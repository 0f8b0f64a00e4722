//! Two-Factor Challenge
//!
//! TOTP enrollment, removal, and the login-time code check.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::user::{TwoFactor, User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::totp_secret::{TotpProvisioning, TotpSecret};
use crate::error::{AuthError, AuthResult};

/// Check the code submitted at login against the user's two-factor state
///
/// Without two-factor the code is ignored.
pub fn challenge(two_factor: &TwoFactor, code: Option<&str>) -> AuthResult<()> {
    let TwoFactor::Enabled(secret) = two_factor else {
        return Ok(());
    };

    let code = code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::TwoFactorRequired)?;

    if secret.verify(code)? {
        Ok(())
    } else {
        Err(AuthError::InvalidTwoFactorCode)
    }
}

/// Two-factor enrollment use case
pub struct TwoFactorUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
}

impl<U> TwoFactorUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self { user_repo, config }
    }

    /// Generate a secret and enable two-factor in one update
    ///
    /// Enrolling again replaces the previous secret.
    pub async fn enroll(&self, user: &User) -> AuthResult<TotpProvisioning> {
        let secret = TotpSecret::generate();
        let provisioning = secret.provisioning(&self.config.totp_issuer, user.email.as_str())?;

        self.user_repo
            .set_two_factor(&user.user_id, Some(&secret))
            .await?;

        tracing::info!(user_id = %user.user_id, "Two-factor enabled");
        Ok(provisioning)
    }

    /// Clear the secret and flag in one update
    pub async fn disable(&self, user: &User) -> AuthResult<()> {
        self.user_repo.set_two_factor(&user.user_id, None).await?;

        tracing::info!(user_id = %user.user_id, "Two-factor disabled");
        Ok(())
    }
}
