//! Sign Out Use Case
//!
//! Revokes the caller's access token and, when supplied, a refresh token.
//! Store failures are logged and never fail the logout.

use std::sync::Arc;

use crate::application::authorize::AuthContext;
use crate::application::token::TokenService;
use crate::domain::entity::revoked_token::RevokedToken;
use crate::domain::repository::RevokedTokenRepository;
use crate::domain::value_object::token_kind::TokenKind;

/// Sign out use case
pub struct SignOutUseCase<T>
where
    T: RevokedTokenRepository,
{
    revocations: Arc<T>,
    tokens: Arc<TokenService>,
}

impl<T> SignOutUseCase<T>
where
    T: RevokedTokenRepository,
{
    pub fn new(revocations: Arc<T>, tokens: Arc<TokenService>) -> Self {
        Self {
            revocations,
            tokens,
        }
    }

    pub async fn execute(&self, ctx: &AuthContext, refresh_token: Option<&str>) {
        let access = RevokedToken::new(
            ctx.token.clone(),
            TokenKind::Access,
            ctx.user.user_id,
            ctx.token_expires_at,
        );
        self.revoke_logged(&access).await;

        if let Some(refresh_token) = refresh_token.map(str::trim).filter(|t| !t.is_empty()) {
            match self.tokens.verify(refresh_token, TokenKind::Refresh) {
                Ok(verified) => {
                    let refresh = RevokedToken::new(
                        refresh_token,
                        TokenKind::Refresh,
                        verified.user_id,
                        verified.expires_at,
                    );
                    self.revoke_logged(&refresh).await;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unverifiable refresh token on logout");
                }
            }
        }

        tracing::info!(user_id = %ctx.user.user_id, "User logged out");
    }

    async fn revoke_logged(&self, entry: &RevokedToken) {
        if let Err(e) = self.revocations.revoke(entry).await {
            tracing::error!(
                user_id = %entry.user_id,
                token_kind = %entry.kind,
                error = %e,
                "Failed to revoke token"
            );
        }
    }
}
