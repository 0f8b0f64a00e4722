//! Google OAuth Client
//!
//! Authorization-code flow against Google's OAuth 2.0 endpoints.

use std::time::Duration;

use serde::Deserialize;

use crate::application::config::GoogleOAuthConfig;
use crate::domain::oauth::{OAuthProfile, OAuthProvider};
use crate::domain::value_object::federation::FederationProvider;
use crate::error::{AuthError, AuthResult};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "openid email profile";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

impl From<UserInfo> for OAuthProfile {
    fn from(info: UserInfo) -> Self {
        OAuthProfile {
            external_id: info.sub,
            email: info.email,
            display_name: info.name,
            given_name: info.given_name,
            family_name: info.family_name,
            avatar_url: info.picture,
        }
    }
}

/// Google OAuth provider
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    config: GoogleOAuthConfig,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<String> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| upstream(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream(format!(
                "token exchange returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| upstream(format!("invalid token response: {}", e)))?;
        Ok(token.access_token)
    }
}

fn upstream(message: String) -> AuthError {
    AuthError::OAuthProvider {
        provider: FederationProvider::Google,
        message,
    }
}

impl OAuthProvider for GoogleOAuthClient {
    fn provider(&self) -> FederationProvider {
        FederationProvider::Google
    }

    fn authorization_url(&self, state: &str) -> AuthResult<String> {
        url::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map(String::from)
        .map_err(|e| upstream(format!("invalid authorization URL: {}", e)))
    }

    async fn fetch_profile(&self, code: &str) -> AuthResult<OAuthProfile> {
        let access_token = self.exchange_code(code).await?;

        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| upstream(format!("userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(upstream(format!(
                "userinfo returned {}",
                response.status()
            )));
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| upstream(format!("invalid userinfo response: {}", e)))?;

        if info.email_verified == Some(false) {
            return Err(upstream("account email is not verified".to_string()));
        }

        Ok(info.into())
    }
}
