//! Refresh Use Case
//!
//! Exchanges a refresh token for a new access token. The refresh token
//! itself is not rotated.

use std::sync::Arc;

use crate::application::token::{IssuedToken, TokenService};
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::token_kind::TokenKind;
use crate::error::{AuthError, AuthResult};

pub struct RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RevokedTokenRepository,
{
    user_repo: Arc<U>,
    revocations: Arc<T>,
    tokens: Arc<TokenService>,
}

impl<U, T> RefreshUseCase<U, T>
where
    U: UserRepository,
    T: RevokedTokenRepository,
{
    pub fn new(user_repo: Arc<U>, revocations: Arc<T>, tokens: Arc<TokenService>) -> Self {
        Self {
            user_repo,
            revocations,
            tokens,
        }
    }

    pub async fn execute(&self, refresh_token: Option<&str>) -> AuthResult<IssuedToken> {
        let refresh_token = refresh_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::RefreshTokenMissing)?;

        let verified = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            })?;

        match self.revocations.is_revoked(refresh_token).await {
            Ok(false) => {}
            Ok(true) => return Err(AuthError::InvalidRefreshToken),
            Err(e) => {
                tracing::error!(error = %e, "Revocation check failed during refresh");
                return Err(AuthError::InvalidRefreshToken);
            }
        }

        let user = self
            .user_repo
            .find_by_id(&verified.user_id)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        Ok(self.tokens.issue_access(&user.user_id, &user.email)?)
    }
}
