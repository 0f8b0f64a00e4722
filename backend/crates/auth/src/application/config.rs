//! Application Configuration
//!
//! Typed configuration for the auth core, read from the environment once at
//! startup and injected into services. Nothing here is global.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use platform::crypto::random_token_hex;
use platform::rate_limit::RateLimitConfig;
use thiserror::Error;

/// Minimum accepted signing secret length
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration errors, reported at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} must be at least {min} characters")]
    SecretTooShort { name: &'static str, min: usize },

    #[error("JWT_SECRET and JWT_REFRESH_SECRET must differ")]
    SecretsNotDistinct,

    #[error("{name} has an invalid duration: {value:?} (expected e.g. 900, 15m, 24h, 7d)")]
    InvalidDuration { name: &'static str, value: String },

    #[error("{name} must be a positive integer: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be an absolute http(s) URL: {value:?}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{name} must be a comma-separated list of IP addresses: {value:?}")]
    InvalidIpAddress { name: &'static str, value: String },
}

/// HMAC signing secret
///
/// Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(name: &'static str, value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::SecretTooShort {
                name,
                min: MIN_SECRET_LENGTH,
            });
        }
        Ok(Self(value))
    }

    /// Random 64-char secret for development and tests
    pub fn random() -> Self {
        Self(random_token_hex(MIN_SECRET_LENGTH))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

/// Google OAuth client credentials
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

impl fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret for access tokens
    pub access_secret: SigningSecret,
    /// Secret for refresh tokens, always distinct from `access_secret`
    pub refresh_secret: SigningSecret,
    /// Access token lifetime (15 minutes)
    pub access_ttl: Duration,
    /// Refresh token lifetime (7 days)
    pub refresh_ttl: Duration,
    /// Email verification token lifetime (24 hours)
    pub email_verification_ttl: Duration,
    /// Public base URL of this API
    pub app_url: String,
    /// Base URL OAuth redirects land on
    pub frontend_url: String,
    /// Present only when both client id and secret are configured
    pub google: Option<GoogleOAuthConfig>,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Login attempts per IP + email
    pub login_rate_limit: RateLimitConfig,
    /// Peers allowed to report the client address via `X-Forwarded-For`
    pub trusted_proxies: Vec<IpAddr>,
    pub revocation_sweep_interval: Duration,
    /// Issuer shown in authenticator apps
    pub totp_issuer: String,
}

impl AuthConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let access_secret = SigningSecret::new(
            "JWT_SECRET",
            get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
        )?;
        let refresh_secret = SigningSecret::new(
            "JWT_REFRESH_SECRET",
            get("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?,
        )?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SecretsNotDistinct);
        }

        let duration = |name: &'static str, default: &str| -> Result<Duration, ConfigError> {
            let value = get(name).unwrap_or_else(|| default.to_string());
            parse_duration(&value).ok_or(ConfigError::InvalidDuration { name, value })
        };

        let url = |name: &'static str, default: &str| -> Result<String, ConfigError> {
            let value = get(name).unwrap_or_else(|| default.to_string());
            match url::Url::parse(&value) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                    Ok(value.trim_end_matches('/').to_string())
                }
                _ => Err(ConfigError::InvalidUrl { name, value }),
            }
        };

        let app_url = url("APP_URL", "http://localhost:5000")?;
        let frontend_url = url("FRONTEND_URL", "http://localhost:3000")?;

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                callback_url: url(
                    "GOOGLE_CALLBACK_URL",
                    &format!("{}/api/auth/google/callback", app_url),
                )?,
            }),
            _ => None,
        };

        let max_attempts = match get("LOGIN_RATE_LIMIT_MAX") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber {
                    name: "LOGIN_RATE_LIMIT_MAX",
                    value,
                })?,
            None => 5,
        };
        let window = duration("LOGIN_RATE_LIMIT_WINDOW", "15m")?;

        let trusted_proxies = match get("TRUSTED_PROXIES") {
            Some(value) => parse_ip_list(&value).ok_or(ConfigError::InvalidIpAddress {
                name: "TRUSTED_PROXIES",
                value,
            })?,
            None => Vec::new(),
        };

        Ok(Self {
            access_secret,
            refresh_secret,
            access_ttl: duration("JWT_EXPIRES_IN", "15m")?,
            refresh_ttl: duration("JWT_REFRESH_EXPIRES_IN", "7d")?,
            email_verification_ttl: duration("EMAIL_VERIFICATION_EXPIRES_IN", "24h")?,
            app_url,
            frontend_url,
            google,
            password_pepper: get("PASSWORD_PEPPER").map(String::into_bytes),
            login_rate_limit: RateLimitConfig {
                max_requests: max_attempts,
                window,
            },
            trusted_proxies,
            revocation_sweep_interval: duration("REVOCATION_SWEEP_INTERVAL", "1h")?,
            totp_issuer: get("TOTP_ISSUER").unwrap_or_else(|| "URA".to_string()),
        })
    }

    /// Create config for development and tests (random distinct secrets)
    pub fn development() -> Self {
        Self {
            access_secret: SigningSecret::random(),
            refresh_secret: SigningSecret::random(),
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            email_verification_ttl: Duration::from_secs(24 * 3600),
            app_url: "http://localhost:5000".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            google: None,
            password_pepper: None,
            login_rate_limit: RateLimitConfig::new(5, 15 * 60),
            trusted_proxies: Vec::new(),
            revocation_sweep_interval: Duration::from_secs(3600),
            totp_issuer: "URA".to_string(),
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

fn parse_ip_list(value: &str) -> Option<Vec<IpAddr>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.parse().ok())
        .collect()
}

/// Parse `900`, `30s`, `15m`, `24h` or `7d`; zero is rejected
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit_secs) = match value.char_indices().last()? {
        (i, 's') => (&value[..i], 1),
        (i, 'm') => (&value[..i], 60),
        (i, 'h') => (&value[..i], 3600),
        (i, 'd') => (&value[..i], 86_400),
        _ => (value, 1),
    };

    let amount: u64 = digits.trim().parse().ok()?;
    if amount == 0 {
        return None;
    }
    amount.checked_mul(unit_secs).map(Duration::from_secs)
}
