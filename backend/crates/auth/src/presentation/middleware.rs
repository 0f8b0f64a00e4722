//! Auth Middleware
//!
//! The Authorization Gate in front of every protected route, plus a
//! client address extractor for handlers.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use platform::client::{extract_bearer_token, extract_client_ip};

use crate::application::{AuthorizeUseCase, TokenService};
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::error::AuthError;

/// State the gate needs: user lookup, revocation lookup, token verification
pub struct AuthGate<R> {
    pub repo: Arc<R>,
    pub tokens: Arc<TokenService>,
}

impl<R> Clone for AuthGate<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

/// Require a valid, unrevoked access token
///
/// On success the resolved [`AuthContext`](crate::application::AuthContext)
/// is inserted into the request extensions. Every failure is the same 401.
pub async fn require_auth<R>(
    State(gate): State<AuthGate<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: UserRepository + RevokedTokenRepository + Send + Sync + 'static,
{
    let bearer = extract_bearer_token(req.headers()).map(str::to_owned);

    let use_case = AuthorizeUseCase::new(gate.repo.clone(), gate.repo.clone(), gate.tokens.clone());
    let ctx = use_case.execute(bearer.as_deref()).await?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Peers whose `X-Forwarded-For` header is believed
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(pub Vec<IpAddr>);

/// Client address keying the login rate limit
///
/// The socket peer, unless that peer is a trusted proxy, in which case the
/// forwarded client address is used. `None` without connect info.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
    TrustedProxies: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TrustedProxies(trusted) = TrustedProxies::from_ref(state);
        let direct = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());

        Ok(ClientIp(extract_client_ip(&parts.headers, direct, &trusted)))
    }
}
