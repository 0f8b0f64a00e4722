//! Authorization Gate
//!
//! Turns a bearer token into an authenticated context.
//! Fails closed: any doubt ends in `AuthError::Unauthorized`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::application::token::TokenService;
use crate::domain::entity::user::User;
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::token_kind::TokenKind;
use crate::error::{AuthError, AuthResult, TokenError, UnauthorizedReason};

/// Identity attached to a request that passed the gate
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    /// The raw access token, so logout can revoke it
    pub token: String,
    /// `exp` of that token
    pub token_expires_at: DateTime<Utc>,
}

pub struct AuthorizeUseCase<U, T>
where
    U: UserRepository,
    T: RevokedTokenRepository,
{
    user_repo: Arc<U>,
    revocations: Arc<T>,
    tokens: Arc<TokenService>,
}

impl<U, T> AuthorizeUseCase<U, T>
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

    pub async fn execute(&self, bearer: Option<&str>) -> AuthResult<AuthContext> {
        let token = bearer.ok_or(AuthError::Unauthorized(UnauthorizedReason::MissingToken))?;

        let verified = self
            .tokens
            .verify(token, TokenKind::Access)
            .map_err(|e| {
                AuthError::Unauthorized(match e {
                    TokenError::Expired => UnauthorizedReason::ExpiredToken,
                    _ => UnauthorizedReason::InvalidToken,
                })
            })?;

        match self.revocations.is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(AuthError::Unauthorized(UnauthorizedReason::Revoked));
            }
            Err(e) => {
                tracing::error!(error = %e, "Revocation check failed");
                return Err(AuthError::Unauthorized(
                    UnauthorizedReason::RevocationCheckFailed,
                ));
            }
        }

        let user = self
            .user_repo
            .find_by_id(&verified.user_id)
            .await?
            .ok_or(AuthError::Unauthorized(UnauthorizedReason::UnknownSubject))?;

        Ok(AuthContext {
            user,
            token: token.to_string(),
            token_expires_at: verified.expires_at,
        })
    }
}
