//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, FromRef, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use platform::rate_limit::InMemoryRateLimiter;

use crate::application::config::AuthConfig;
use crate::application::{
    AuthContext, OAuthSignInUseCase, OAuthStateStore, RefreshUseCase, SignInInput, SignInUseCase,
    SignOutUseCase, SignUpInput, SignUpUseCase, TokenService, TwoFactorUseCase,
    VerifyEmailUseCase,
};
use crate::domain::mailer::VerificationMailer;
use crate::domain::oauth::OAuthProvider;
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::federation::FederationProvider;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    ApiResponse, AppJson, LoginRequest, LoginResponse, LogoutRequest, MeResponse,
    OAuthCallbackQuery, RefreshRequest, RefreshResponse, RegisterRequest,
    TwoFactorEnableResponse, UserResponse, VerifyEmailQuery,
};
use crate::presentation::middleware::{AuthGate, ClientIp, TrustedProxies};

/// Repository bound shared by every handler
pub trait AuthRepo: UserRepository + RevokedTokenRepository + Send + Sync + 'static {}

impl<T> AuthRepo for T where T: UserRepository + RevokedTokenRepository + Send + Sync + 'static {}

/// Shared state for auth handlers
pub struct AuthAppState<R, M, P> {
    pub repo: Arc<R>,
    pub mailer: Arc<M>,
    /// `None` when the provider has no client credentials
    pub oauth: Option<Arc<P>>,
    pub oauth_states: Arc<OAuthStateStore>,
    pub tokens: Arc<TokenService>,
    pub limiter: Arc<InMemoryRateLimiter>,
    pub config: Arc<AuthConfig>,
}

impl<R, M, P> AuthAppState<R, M, P> {
    pub fn new(repo: R, mailer: M, oauth: Option<P>, config: AuthConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            mailer: Arc::new(mailer),
            oauth: oauth.map(Arc::new),
            oauth_states: Arc::new(OAuthStateStore::default()),
            tokens: Arc::new(TokenService::new(&config)),
            limiter: Arc::new(InMemoryRateLimiter::new()),
            config: Arc::new(config),
        }
    }

    /// State for the Authorization Gate middleware
    pub fn gate(&self) -> AuthGate<R> {
        AuthGate {
            repo: self.repo.clone(),
            tokens: self.tokens.clone(),
        }
    }

    fn oauth_provider(&self) -> AuthResult<Arc<P>> {
        self.oauth.clone().ok_or(AuthError::OAuthNotConfigured {
            provider: FederationProvider::Google,
        })
    }
}

impl<R, M, P> Clone for AuthAppState<R, M, P> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            mailer: self.mailer.clone(),
            oauth: self.oauth.clone(),
            oauth_states: self.oauth_states.clone(),
            tokens: self.tokens.clone(),
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, M, P> FromRef<AuthAppState<R, M, P>> for TrustedProxies {
    fn from_ref(state: &AuthAppState<R, M, P>) -> Self {
        TrustedProxies(state.config.trusted_proxies.clone())
    }
}

// ============================================================================
// Register / Verify
// ============================================================================

/// POST /api/auth/register
pub async fn register<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());

    use_case
        .execute(SignUpInput {
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            email: req.email.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message(
            "Registration successful. Please check your email to verify your account.",
        )),
    ))
}

/// GET /api/auth/verify-email?token=
pub async fn verify_email<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    query: Result<Query<VerifyEmailQuery>, QueryRejection>,
) -> AuthResult<Json<ApiResponse<()>>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let Query(query) = query?;

    VerifyEmailUseCase::new(state.repo.clone())
        .execute(query.token.as_deref())
        .await?;

    Ok(Json(ApiResponse::message(
        "Email verified successfully. You can now log in.",
    )))
}

// ============================================================================
// Login / Refresh / Logout
// ============================================================================

/// POST /api/auth/login
pub async fn login<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    ClientIp(client_ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> AuthResult<Json<ApiResponse<LoginResponse>>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.limiter.clone(),
        state.tokens.clone(),
        state.config.clone(),
    );

    let output = use_case
        .execute(SignInInput {
            email: req.email.unwrap_or_default(),
            password: req.password.unwrap_or_default(),
            two_factor_code: req.two_factor_code,
            client_ip,
        })
        .await?;

    Ok(Json(ApiResponse::with_data(
        "Login successful",
        LoginResponse {
            access_token: output.access_token.token,
            refresh_token: output.refresh_token.token,
            user: UserResponse::from(&output.user),
        },
    )))
}

/// POST /api/auth/refresh
pub async fn refresh<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    AppJson(req): AppJson<RefreshRequest>,
) -> AuthResult<Json<ApiResponse<RefreshResponse>>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let use_case = RefreshUseCase::new(state.repo.clone(), state.repo.clone(), state.tokens.clone());
    let access = use_case.execute(req.refresh_token.as_deref()).await?;

    Ok(Json(ApiResponse::with_data(
        "Token refreshed successfully",
        RefreshResponse {
            access_token: access.token,
        },
    )))
}

/// POST /api/auth/logout
///
/// The body is optional and never rejected: an unreadable body just means
/// no refresh token to revoke.
pub async fn logout<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    Extension(ctx): Extension<AuthContext>,
    body: Bytes,
) -> Json<ApiResponse<()>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let refresh_token = serde_json::from_slice::<LogoutRequest>(&body)
        .ok()
        .and_then(|req| req.refresh_token);

    SignOutUseCase::new(state.repo.clone(), state.tokens.clone())
        .execute(&ctx, refresh_token.as_deref())
        .await;

    Json(ApiResponse::message("Logged out successfully"))
}

/// GET /api/auth/me
pub async fn me(Extension(ctx): Extension<AuthContext>) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::with_data(
        "User retrieved successfully",
        MeResponse {
            user: UserResponse::from(&ctx.user),
        },
    ))
}

// ============================================================================
// Two-factor
// ============================================================================

/// POST /api/auth/2fa/enable
pub async fn enable_two_factor<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    Extension(ctx): Extension<AuthContext>,
) -> AuthResult<Json<ApiResponse<TwoFactorEnableResponse>>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let provisioning = TwoFactorUseCase::new(state.repo.clone(), state.config.clone())
        .enroll(&ctx.user)
        .await?;

    Ok(Json(ApiResponse::with_data(
        "2FA enabled successfully",
        TwoFactorEnableResponse::from(provisioning),
    )))
}

/// POST /api/auth/2fa/disable
pub async fn disable_two_factor<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    Extension(ctx): Extension<AuthContext>,
) -> AuthResult<Json<ApiResponse<()>>>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    TwoFactorUseCase::new(state.repo.clone(), state.config.clone())
        .disable(&ctx.user)
        .await?;

    Ok(Json(ApiResponse::message("2FA disabled successfully")))
}

// ============================================================================
// Google OAuth
// ============================================================================

/// GET /api/auth/google
pub async fn google_begin<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
) -> AuthResult<Redirect>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let provider = state.oauth_provider()?;
    let use_case = OAuthSignInUseCase::new(
        state.repo.clone(),
        provider,
        state.oauth_states.clone(),
        state.tokens.clone(),
    );

    Ok(Redirect::to(&use_case.begin()?))
}

/// GET /api/auth/google/callback?code&state
///
/// Always answers with a redirect to the frontend once the provider is
/// configured; failures are logged and signalled with `error=oauth_failed`.
pub async fn google_callback<R, M, P>(
    State(state): State<AuthAppState<R, M, P>>,
    query: Result<Query<OAuthCallbackQuery>, QueryRejection>,
) -> AuthResult<Response>
where
    R: AuthRepo,
    M: VerificationMailer + Send + Sync + 'static,
    P: OAuthProvider + Send + Sync + 'static,
{
    let provider = state.oauth_provider()?;
    let frontend = state.config.frontend_url.clone();

    let location = match complete_callback(&state, provider, query).await {
        Ok(location) => location,
        Err(e) => {
            e.log();
            format!("{}/auth/login?error=oauth_failed", frontend)
        }
    };

    Ok(Redirect::to(&location).into_response())
}

async fn complete_callback<R, M, P>(
    state: &AuthAppState<R, M, P>,
    provider: Arc<P>,
    query: Result<Query<OAuthCallbackQuery>, QueryRejection>,
) -> AuthResult<String>
where
    R: AuthRepo,
    P: OAuthProvider + Send + Sync + 'static,
{
    let Query(query) = query?;
    if let Some(error) = query.error {
        return Err(AuthError::OAuthProvider {
            provider: provider.provider(),
            message: format!("authorization denied: {}", error),
        });
    }

    let use_case = OAuthSignInUseCase::new(
        state.repo.clone(),
        provider,
        state.oauth_states.clone(),
        state.tokens.clone(),
    );
    let output = use_case
        .complete(query.code.as_deref(), query.state.as_deref())
        .await?;

    success_redirect(
        &state.config.frontend_url,
        &output.access_token.token,
        &output.refresh_token.token,
    )
}

fn success_redirect(frontend: &str, access: &str, refresh: &str) -> AuthResult<String> {
    let base = format!("{}/auth/oauth/success", frontend);
    url::Url::parse_with_params(&base, &[("accessToken", access), ("refreshToken", refresh)])
        .map(String::from)
        .map_err(|e| AuthError::Internal(format!("invalid frontend URL: {}", e)))
}
