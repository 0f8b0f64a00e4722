//! Router-level scenarios against the in-memory repository

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use std::net::SocketAddr;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::application::TokenService;
use crate::application::config::{AuthConfig, GoogleOAuthConfig};
use crate::domain::entity::{
    credentials::StoredCredentials, revoked_token::RevokedToken, user::User,
};
use crate::domain::mailer::VerificationMailer;
use crate::domain::oauth::{OAuthProfile, OAuthProvider};
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, federation::FederationProvider, token_kind::TokenKind,
    totp_secret::TotpSecret, user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};
use crate::infra::InMemoryAuthRepository;
use crate::presentation::{AuthAppState, auth_router};

const PASSWORD: &str = "Str0ng!Pass";

// ============================================================================
// Doubles
// ============================================================================

#[derive(Clone, Default)]
struct CapturingMailer {
    links: Arc<Mutex<Vec<String>>>,
}

impl CapturingMailer {
    fn last_token(&self) -> String {
        let links = self.links.lock().unwrap();
        let link = url::Url::parse(links.last().expect("no verification mail sent")).unwrap();
        link.query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }
}

impl VerificationMailer for CapturingMailer {
    async fn send_verification(&self, _to: &Email, link: &str) -> AuthResult<()> {
        self.links.lock().unwrap().push(link.to_string());
        Ok(())
    }
}

struct FakeGoogle {
    profile: OAuthProfile,
}

impl OAuthProvider for FakeGoogle {
    fn provider(&self) -> FederationProvider {
        FederationProvider::Google
    }

    fn authorization_url(&self, state: &str) -> AuthResult<String> {
        Ok(format!("https://accounts.test/auth?state={}", state))
    }

    async fn fetch_profile(&self, code: &str) -> AuthResult<OAuthProfile> {
        if code == "good-code" {
            Ok(self.profile.clone())
        } else {
            Err(AuthError::OAuthProvider {
                provider: FederationProvider::Google,
                message: "invalid_grant".to_string(),
            })
        }
    }
}

/// Delegates to the in-memory store; revocation reads or writes fail on demand
#[derive(Clone, Default)]
struct FlakyRevocations {
    inner: InMemoryAuthRepository,
    reads_broken: Arc<AtomicBool>,
    writes_broken: Arc<AtomicBool>,
}

fn unavailable(flag: &AtomicBool) -> AuthResult<()> {
    if flag.load(Ordering::SeqCst) {
        Err(AuthError::Internal("revocation store unavailable".to_string()))
    } else {
        Ok(())
    }
}

impl UserRepository for FlakyRevocations {
    async fn create(&self, user: &User, password: Option<&UserPassword>) -> AuthResult<()> {
        self.inner.create(user, password).await
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        self.inner.find_by_id(user_id).await
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> AuthResult<Option<StoredCredentials>> {
        self.inner.find_credentials_by_email(email).await
    }

    async fn find_by_federated_id(
        &self,
        provider: FederationProvider,
        external_id: &str,
    ) -> AuthResult<Option<User>> {
        self.inner.find_by_federated_id(provider, external_id).await
    }

    async fn find_by_verification_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        self.inner.find_by_verification_hash(token_hash, now).await
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        self.inner.exists_by_email(email).await
    }

    async fn mark_email_verified(&self, user_id: &UserId) -> AuthResult<()> {
        self.inner.mark_email_verified(user_id).await
    }

    async fn link_federated_id(
        &self,
        user_id: &UserId,
        provider: FederationProvider,
        external_id: &str,
        avatar: Option<&str>,
    ) -> AuthResult<()> {
        self.inner
            .link_federated_id(user_id, provider, external_id, avatar)
            .await
    }

    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()> {
        self.inner.record_login(user_id, at).await
    }

    async fn set_two_factor(
        &self,
        user_id: &UserId,
        secret: Option<&TotpSecret>,
    ) -> AuthResult<()> {
        self.inner.set_two_factor(user_id, secret).await
    }
}

impl RevokedTokenRepository for FlakyRevocations {
    async fn revoke(&self, entry: &RevokedToken) -> AuthResult<()> {
        unavailable(&self.writes_broken)?;
        self.inner.revoke(entry).await
    }

    async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        unavailable(&self.reads_broken)?;
        self.inner.is_revoked(token).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        unavailable(&self.writes_broken)?;
        self.inner.purge_expired(now).await
    }
}

// ============================================================================
// Harness
// ============================================================================

struct TestApp<R> {
    router: Router,
    repo: R,
    mailer: CapturingMailer,
    tokens: Arc<TokenService>,
}

fn app_with<R>(repo: R, oauth: Option<FakeGoogle>) -> TestApp<R>
where
    R: UserRepository + RevokedTokenRepository + Clone + Send + Sync + 'static,
{
    app_with_config(repo, oauth, AuthConfig::development())
}

fn app_with_config<R>(repo: R, oauth: Option<FakeGoogle>, mut config: AuthConfig) -> TestApp<R>
where
    R: UserRepository + RevokedTokenRepository + Clone + Send + Sync + 'static,
{
    let mailer = CapturingMailer::default();
    if oauth.is_some() {
        config.google = Some(GoogleOAuthConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            callback_url: "http://localhost:5000/api/auth/google/callback".to_string(),
        });
    }

    let state = AuthAppState::new(repo.clone(), mailer.clone(), oauth, config);
    TestApp {
        tokens: state.tokens.clone(),
        router: auth_router(state),
        repo,
        mailer,
    }
}

fn app() -> TestApp<InMemoryAuthRepository> {
    app_with(InMemoryAuthRepository::new(), None)
}

fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send<R>(app: &TestApp<R>, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn send_raw<R>(app: &TestApp<R>, req: Request<Body>) -> Response {
    app.router.clone().oneshot(req).await.unwrap()
}

fn location(response: &Response) -> url::Url {
    let value = response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap();
    url::Url::parse(value).unwrap()
}

fn query_param(url: &url::Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

async fn register<R>(app: &TestApp<R>, email: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/register",
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": email,
                "password": PASSWORD
            }),
            None,
        ),
    )
    .await
}

async fn register_and_verify<R>(app: &TestApp<R>, email: &str) {
    let (status, _) = register(app, email).await;
    assert_eq!(status, StatusCode::CREATED);

    let token = app.mailer.last_token();
    let (status, _) = send(app, get(&format!("/verify-email?token={}", token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

async fn login<R>(app: &TestApp<R>, email: &str, code: Option<&str>) -> (StatusCode, Value) {
    let mut body = json!({ "email": email, "password": PASSWORD });
    if let Some(code) = code {
        body["twoFactorCode"] = json!(code);
    }
    send(app, post_json("/login", body, None)).await
}

/// Log in and return `(access, refresh)`
async fn tokens<R>(app: &TestApp<R>, email: &str) -> (String, String) {
    let (status, body) = login(app, email, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        body["data"]["accessToken"].as_str().unwrap().to_string(),
        body["data"]["refreshToken"].as_str().unwrap().to_string(),
    )
}

fn current_code(secret: &str) -> String {
    let secret = TotpSecret::from_base32(secret).unwrap();
    secret.generate_at(Utc::now().timestamp() as u64).unwrap()
}

fn assert_unauthorized(status: StatusCode, body: &Value, message: &str) {
    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["message"], message);
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_before_verification_is_rejected() {
        let app = app();
        let (status, body) = register(&app, "ada@example.com").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);

        let (status, body) = login(&app, "ada@example.com", None).await;
        assert_unauthorized(status, &body, "Please verify your email before logging in");
    }

    #[tokio::test]
    async fn test_verified_login_returns_both_tokens() {
        let app = app();
        register_and_verify(&app, "Ada@Example.com").await;

        let (status, body) = login(&app, "ada@example.com", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert!(body["data"]["accessToken"].is_string());
        assert!(body["data"]["refreshToken"].is_string());
        assert_eq!(body["data"]["user"]["email"], "ada@example.com");
        assert_eq!(body["data"]["user"]["firstName"], "Ada");
    }

    #[tokio::test]
    async fn test_revoked_access_token_is_rejected_after_logout() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let (access, refresh) = tokens(&app, "ada@example.com").await;

        let (status, _) = send(&app, get("/me", Some(&access))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            post_json("/logout", json!({ "refreshToken": refresh }), Some(&access)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
        assert_eq!(app.repo.revoked_count().await, 2);

        let (status, body) = send(&app, get("/me", Some(&access))).await;
        assert_unauthorized(status, &body, "Unauthorized");

        let (status, body) = send(
            &app,
            post_json("/refresh", json!({ "refreshToken": refresh }), None),
        )
        .await;
        assert_unauthorized(status, &body, "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn test_two_factor_enrollment_gates_login() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let (access, _) = tokens(&app, "ada@example.com").await;

        let (status, body) = send(&app, post_json("/2fa/enable", json!({}), Some(&access))).await;
        assert_eq!(status, StatusCode::OK);
        let secret = body["data"]["secret"].as_str().unwrap().to_string();
        assert!(
            body["data"]["qrDataURL"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,")
        );
        assert!(body["data"]["otpauthUrl"].as_str().unwrap().starts_with("otpauth://totp/"));

        let (status, body) = login(&app, "ada@example.com", None).await;
        assert_unauthorized(status, &body, "2FA code required");

        let (status, body) = login(&app, "ada@example.com", Some("000000")).await;
        if current_code(&secret) != "000000" {
            assert_unauthorized(status, &body, "Invalid 2FA code");
        }

        let (status, _) = login(&app, "ada@example.com", Some(&current_code(&secret))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_two_factor_enrollment_with_colon_in_email() {
        let app = app();
        register_and_verify(&app, "a:b@example.com").await;
        let (access, _) = tokens(&app, "a:b@example.com").await;

        let (status, body) = send(&app, post_json("/2fa/enable", json!({}), Some(&access))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let secret = body["data"]["secret"].as_str().unwrap().to_string();
        assert!(body["data"]["otpauthUrl"].as_str().unwrap().contains("a_b%40example.com"));

        let (status, _) = login(&app, "a:b@example.com", Some(&current_code(&secret))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disable_two_factor_restores_plain_login() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let (access, _) = tokens(&app, "ada@example.com").await;

        send(&app, post_json("/2fa/enable", json!({}), Some(&access))).await;
        let (status, _) = send(&app, post_json("/2fa/disable", json!({}), Some(&access))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = login(&app, "ada@example.com", Some("123456")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let (access, refresh) = tokens(&app, "ada@example.com").await;

        let (status, body) = send(
            &app,
            post_json("/refresh", json!({ "refreshToken": access }), None),
        )
        .await;
        assert_unauthorized(status, &body, "Invalid or expired refresh token");

        let (status, body) = send(&app, get("/me", Some(&refresh))).await;
        assert_unauthorized(status, &body, "Unauthorized");

        let (status, body) = send(
            &app,
            post_json("/refresh", json!({ "refreshToken": refresh }), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_access = body["data"]["accessToken"].as_str().unwrap();
        let (status, _) = send(&app, get("/me", Some(new_access))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

// ============================================================================
// Registration / login edge cases
// ============================================================================

mod registration_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_is_validation_error() {
        let app = app();
        register(&app, "ada@example.com").await;

        let (status, body) = register(&app, "ADA@example.com").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Email already in use");
    }

    #[tokio::test]
    async fn test_invalid_fields_are_reported_individually() {
        let app = app();
        let (status, body) = send(
            &app,
            post_json(
                "/register",
                json!({ "firstName": "", "email": "nope", "password": "short" }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let fields: Vec<&str> = body["error"]["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"firstName"));
        assert!(fields.contains(&"lastName"));
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_validation_error() {
        let app = app();
        let req = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_verification_token_is_single_use() {
        let app = app();
        register(&app, "ada@example.com").await;
        let token = app.mailer.last_token();

        let uri = format!("/verify-email?token={}", token);
        let (status, _) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get(&uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid or expired verification token");

        let (status, body) = send(&app, get("/verify-email", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Verification token is required");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;

        let (s1, b1) = send(
            &app,
            post_json(
                "/login",
                json!({ "email": "ada@example.com", "password": "Wr0ng!Pass" }),
                None,
            ),
        )
        .await;
        let (s2, b2) = send(
            &app,
            post_json(
                "/login",
                json!({ "email": "ghost@example.com", "password": PASSWORD }),
                None,
            ),
        )
        .await;

        assert_unauthorized(s1, &b1, "Invalid credentials");
        assert_unauthorized(s2, &b2, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_attempts_are_rate_limited() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;

        let wrong = json!({ "email": "ada@example.com", "password": "Wr0ng!Pass" });
        for _ in 0..5 {
            let (status, _) = send(&app, post_json("/login", wrong.clone(), None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, body) = login(&app, "ada@example.com", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMIT_ERROR");
    }

    #[tokio::test]
    async fn test_configured_pepper_is_applied_on_both_sides() {
        let mut config = AuthConfig::development();
        config.password_pepper = Some(b"pepper-pepper-pepper".to_vec());
        let app = app_with_config(InMemoryAuthRepository::new(), None, config);
        register_and_verify(&app, "ada@example.com").await;

        let (status, _) = login(&app, "ada@example.com", None).await;
        assert_eq!(status, StatusCode::OK);

        let stored = app
            .repo
            .find_credentials_by_email(&Email::new("ada@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        let hash = stored.password_hash.unwrap();
        let raw = RawPassword::submitted(PASSWORD.to_string());
        assert!(!hash.verify(&raw, None));
        assert!(hash.verify(&raw, Some(b"pepper-pepper-pepper")));
    }

    fn wrong_login_from(peer: &str, forwarded_for: &str) -> Request<Body> {
        let mut req = post_json(
            "/login",
            json!({ "email": "ada@example.com", "password": "Wr0ng!Pass" }),
            None,
        );
        req.headers_mut()
            .insert("x-forwarded-for", forwarded_for.parse().unwrap());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(peer.parse().unwrap(), 40_000)));
        req
    }

    #[tokio::test]
    async fn test_rotating_forwarded_for_does_not_reset_the_limit() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;

        for i in 0..5 {
            let req = wrong_login_from("203.0.113.9", &format!("10.0.0.{}", i));
            let (status, _) = send(&app, req).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let (status, body) = send(&app, wrong_login_from("203.0.113.9", "10.0.0.99")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMIT_ERROR");
    }

    #[tokio::test]
    async fn test_trusted_proxy_forwards_distinct_clients() {
        let mut config = AuthConfig::development();
        config.trusted_proxies = vec!["10.0.0.1".parse().unwrap()];
        let app = app_with_config(InMemoryAuthRepository::new(), None, config);
        register_and_verify(&app, "ada@example.com").await;

        for _ in 0..5 {
            let (status, _) = send(&app, wrong_login_from("10.0.0.1", "198.51.100.1")).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = send(&app, wrong_login_from("10.0.0.1", "198.51.100.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let (status, _) = send(&app, wrong_login_from("10.0.0.1", "198.51.100.2")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

// ============================================================================
// Authorization Gate
// ============================================================================

mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_and_malformed_bearer() {
        let app = app();

        let (status, body) = send(&app, get("/me", None)).await;
        assert_unauthorized(status, &body, "Unauthorized");

        let (status, body) = send(&app, get("/me", Some("not-a-jwt"))).await;
        assert_unauthorized(status, &body, "Unauthorized");

        let (status, body) = send(&app, post_json("/logout", json!({}), None)).await;
        assert_unauthorized(status, &body, "Unauthorized");
    }

    #[tokio::test]
    async fn test_tokens_for_a_missing_account_are_rejected() {
        let app = app();
        let ghost = UserId::new();
        let email = Email::new("ghost@example.com").unwrap();
        let access = app.tokens.issue_access(&ghost, &email).unwrap();
        let refresh = app.tokens.issue_refresh(&ghost, &email).unwrap();

        let (status, body) = send(&app, get("/me", Some(&access.token))).await;
        assert_unauthorized(status, &body, "Unauthorized");

        let (status, body) = send(
            &app,
            post_json("/refresh", json!({ "refreshToken": refresh.token }), None),
        )
        .await;
        assert_unauthorized(status, &body, "Invalid or expired refresh token");
    }

    #[tokio::test]
    async fn test_expired_access_token_is_plain_unauthorized() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let email = Email::new("ada@example.com").unwrap();
        let user = app.repo.find_by_email(&email).await.unwrap().unwrap();

        let stale = app
            .tokens
            .issue_at(
                TokenKind::Access,
                &user.user_id,
                &email,
                Utc::now() - chrono::Duration::hours(1),
            )
            .unwrap();

        let (status, body) = send(&app, get("/me", Some(&stale.token))).await;
        assert_unauthorized(status, &body, "Unauthorized");
    }

    #[tokio::test]
    async fn test_fails_closed_when_revocation_store_is_down() {
        let repo = FlakyRevocations::default();
        let app = app_with(repo.clone(), None);
        register_and_verify(&app, "ada@example.com").await;
        let (access, _) = tokens(&app, "ada@example.com").await;

        repo.reads_broken.store(true, Ordering::SeqCst);
        let (status, body) = send(&app, get("/me", Some(&access))).await;
        assert_unauthorized(status, &body, "Unauthorized");

        repo.reads_broken.store(false, Ordering::SeqCst);
        let (status, _) = send(&app, get("/me", Some(&access))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_succeeds_when_revocation_write_fails() {
        let repo = FlakyRevocations::default();
        let app = app_with(repo.clone(), None);
        register_and_verify(&app, "ada@example.com").await;
        let (access, refresh) = tokens(&app, "ada@example.com").await;

        repo.writes_broken.store(true, Ordering::SeqCst);
        let (status, body) = send(
            &app,
            post_json("/logout", json!({ "refreshToken": refresh }), Some(&access)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
        assert_eq!(repo.inner.revoked_count().await, 0);

        repo.writes_broken.store(false, Ordering::SeqCst);
        let (status, _) = send(&app, get("/me", Some(&access))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_ignores_unreadable_body() {
        let app = app();
        register_and_verify(&app, "ada@example.com").await;
        let (access, _) = tokens(&app, "ada@example.com").await;

        let req = Request::builder()
            .method("POST")
            .uri("/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", access))
            .body(Body::from("garbage"))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.repo.revoked_count().await, 1);
    }
}

// ============================================================================
// OAuth
// ============================================================================

mod oauth_tests {
    use super::*;
    use crate::application::OAuthResolver;

    fn google_profile(email: &str) -> OAuthProfile {
        OAuthProfile {
            external_id: "google-123".to_string(),
            email: Some(email.to_string()),
            display_name: Some("Ada Lovelace".to_string()),
            avatar_url: Some("https://img.test/ada.png".to_string()),
            ..OAuthProfile::default()
        }
    }

    #[tokio::test]
    async fn test_not_configured_is_external_service_error() {
        let app = app();
        let (status, body) = send(&app, get("/google", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn test_round_trip_and_single_use_state() {
        let fake = FakeGoogle {
            profile: google_profile("ada@example.com"),
        };
        let app = app_with(InMemoryAuthRepository::new(), Some(fake));

        let response = send_raw(&app, get("/google", None)).await;
        assert!(response.status().is_redirection());
        let state = query_param(&location(&response), "state").unwrap();

        let callback = format!("/google/callback?code=good-code&state={}", state);
        let response = send_raw(&app, get(&callback, None)).await;
        let target = location(&response);
        assert_eq!(target.path(), "/auth/oauth/success");
        let access = query_param(&target, "accessToken").unwrap();
        assert!(query_param(&target, "refreshToken").is_some());

        let (status, body) = send(&app, get("/me", Some(&access))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["firstName"], "Ada");
        assert_eq!(body["data"]["user"]["lastName"], "Lovelace");

        let response = send_raw(&app, get(&callback, None)).await;
        let target = location(&response);
        assert_eq!(target.path(), "/auth/login");
        assert_eq!(query_param(&target, "error").as_deref(), Some("oauth_failed"));
    }

    #[tokio::test]
    async fn test_provider_failure_redirects_with_error() {
        let fake = FakeGoogle {
            profile: google_profile("ada@example.com"),
        };
        let app = app_with(InMemoryAuthRepository::new(), Some(fake));

        let response = send_raw(&app, get("/google", None)).await;
        let state = query_param(&location(&response), "state").unwrap();

        let callback = format!("/google/callback?code=bad-code&state={}", state);
        let response = send_raw(&app, get(&callback, None)).await;
        assert_eq!(
            query_param(&location(&response), "error").as_deref(),
            Some("oauth_failed")
        );
    }

    #[tokio::test]
    async fn test_resolver_links_existing_local_account_once() {
        let app = app();
        register(&app, "ada@example.com").await;
        let repo = Arc::new(app.repo.clone());
        let resolver = OAuthResolver::new(repo.clone());

        let first = resolver
            .resolve(FederationProvider::Google, google_profile("ada@example.com"))
            .await
            .unwrap();
        let second = resolver
            .resolve(FederationProvider::Google, google_profile("ada@example.com"))
            .await
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert!(first.email_verified);
        assert_eq!(first.google_id.as_deref(), Some("google-123"));

        let stored = repo
            .find_by_email(&Email::new("ada@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(stored.email_verified);
        assert_eq!(stored.profile_picture.as_deref(), Some("https://img.test/ada.png"));
    }

    #[tokio::test]
    async fn test_resolver_requires_an_email_for_new_accounts() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let resolver = OAuthResolver::new(repo);

        let profile = OAuthProfile {
            external_id: "google-999".to_string(),
            ..OAuthProfile::default()
        };
        let err = resolver
            .resolve(FederationProvider::Google, profile)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

// ============================================================================
// Error boundary
// ============================================================================

mod error_status_tests {
    use super::*;
    use crate::error::{TokenError, UnauthorizedReason};
    use kernel::error::app_error::AppError;

    #[test]
    fn test_status_table() {
        let cases = vec![
            (AuthError::EmailTaken, 400),
            (AuthError::VerificationTokenMissing, 400),
            (AuthError::OAuthStateInvalid, 400),
            (AuthError::InvalidCredentials, 401),
            (AuthError::EmailNotVerified, 401),
            (AuthError::TwoFactorRequired, 401),
            (AuthError::InvalidRefreshToken, 401),
            (
                AuthError::Unauthorized(UnauthorizedReason::RevocationCheckFailed),
                401,
            ),
            (AuthError::Token(TokenError::Expired), 401),
            (AuthError::Token(TokenError::Signing("overflow".to_string())), 500),
            (AuthError::TooManyAttempts, 429),
            (AuthError::UserNotFound, 404),
            (
                AuthError::OAuthNotConfigured {
                    provider: FederationProvider::Google,
                },
                503,
            ),
            (AuthError::App(AppError::conflict("dup")), 409),
            (AuthError::Database(sqlx::Error::PoolTimedOut), 503),
            (AuthError::Internal("boom".to_string()), 500),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code().as_u16(), expected, "{err:?}");
        }
    }

    #[test]
    fn test_token_errors_share_one_message() {
        let invalid = AppError::from(AuthError::Token(TokenError::Invalid));
        let expired = AppError::from(AuthError::Token(TokenError::Expired));
        assert_eq!(invalid.message(), expired.message());
    }
}
