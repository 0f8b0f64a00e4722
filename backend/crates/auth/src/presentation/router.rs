//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::application::config::AuthConfig;
use crate::domain::mailer::VerificationMailer;
use crate::domain::oauth::OAuthProvider;
use crate::error::AuthResult;
use crate::infra::{GoogleOAuthClient, LogMailer, PgAuthRepository};
use crate::presentation::handlers::{self, AuthAppState, AuthRepo};
use crate::presentation::middleware::require_auth;

/// Handler state backed by PostgreSQL, the logging mailer and Google
pub type PgAuthAppState = AuthAppState<PgAuthRepository, LogMailer, GoogleOAuthClient>;

/// Build the production state
///
/// Google sign-in is enabled only when the config carries client credentials.
pub fn pg_auth_state(repo: PgAuthRepository, config: AuthConfig) -> AuthResult<PgAuthAppState> {
    let google = config
        .google
        .clone()
        .map(GoogleOAuthClient::new)
        .transpose()?;

    Ok(AuthAppState::new(repo, LogMailer, google, config))
}

/// Create the Auth router for any repository, mailer and provider
pub fn auth_router<R, M, P>(state: AuthAppState<R, M, P>) -> Router
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let protected = Router::new()
        .route("/logout", post(handlers::logout::<R, M, P>))
        .route("/me", get(handlers::me))
        .route("/2fa/enable", post(handlers::enable_two_factor::<R, M, P>))
        .route("/2fa/disable", post(handlers::disable_two_factor::<R, M, P>))
        .route_layer(middleware::from_fn_with_state(
            state.gate(),
            require_auth::<R>,
        ));

    Router::new()
        .route("/register", post(handlers::register::<R, M, P>))
        .route("/verify-email", get(handlers::verify_email::<R, M, P>))
        .route("/login", post(handlers::login::<R, M, P>))
        .route("/refresh", post(handlers::refresh::<R, M, P>))
        .route("/google", get(handlers::google_begin::<R, M, P>))
        .route("/google/callback", get(handlers::google_callback::<R, M, P>))
        .merge(protected)
        .with_state(state)
}
