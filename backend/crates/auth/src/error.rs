//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system and its response envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use derive_more::Display;
use kernel::error::{app_error::AppError, conversions::classify_sqlx, kind::ErrorKind};
use serde::Serialize;
use thiserror::Error;

use crate::domain::value_object::federation::FederationProvider;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Token verification / signing failures
///
/// `Invalid` and `Expired` are distinguished internally only; both render
/// as the same 401.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed token or wrong kind
    #[error("Invalid token")]
    Invalid,

    /// Valid signature, past expiry
    #[error("Token expired")]
    Expired,

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Why the Authorization Gate refused a request (logged, never returned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UnauthorizedReason {
    #[display("missing bearer token")]
    MissingToken,
    #[display("invalid token")]
    InvalidToken,
    #[display("expired token")]
    ExpiredToken,
    #[display("revoked token")]
    Revoked,
    #[display("revocation store unavailable")]
    RevocationCheckFailed,
    #[display("unknown subject")]
    UnknownSubject,
}

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldIssue>,
    },

    #[error("Email already in use")]
    EmailTaken,

    #[error("Verification token is required")]
    VerificationTokenMissing,

    #[error("Invalid or expired verification token")]
    InvalidVerificationToken,

    #[error("Refresh token is required")]
    RefreshTokenMissing,

    /// Unknown email, missing hash or wrong password; never distinguished
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please verify your email before logging in")]
    EmailNotVerified,

    #[error("2FA code required")]
    TwoFactorRequired,

    #[error("Invalid 2FA code")]
    InvalidTwoFactorCode,

    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Authorization Gate refusal
    #[error("Unauthorized")]
    Unauthorized(UnauthorizedReason),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Too many login attempts. Please try again later.")]
    TooManyAttempts,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired OAuth state")]
    OAuthStateInvalid,

    #[error("{provider} OAuth is not configured")]
    OAuthNotConfigured { provider: FederationProvider },

    /// Provider call failed (token exchange, profile fetch)
    #[error("{} service error: {message}", .provider.service_name())]
    OAuthProvider {
        provider: FederationProvider,
        message: String,
    },

    /// Error raised by a value object or another kernel-aware component
    #[error(transparent)]
    App(#[from] AppError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Validation failure carrying per-field issues
    pub fn invalid_fields(fields: Vec<FieldIssue>) -> Self {
        AuthError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Validation { .. }
            | AuthError::EmailTaken
            | AuthError::VerificationTokenMissing
            | AuthError::InvalidVerificationToken
            | AuthError::RefreshTokenMissing
            | AuthError::OAuthStateInvalid => ErrorKind::Validation,
            AuthError::InvalidCredentials
            | AuthError::EmailNotVerified
            | AuthError::TwoFactorRequired
            | AuthError::InvalidTwoFactorCode
            | AuthError::InvalidRefreshToken
            | AuthError::Unauthorized(_) => ErrorKind::Authentication,
            AuthError::Token(TokenError::Signing(_)) => ErrorKind::Internal,
            AuthError::Token(_) => ErrorKind::Token,
            AuthError::TooManyAttempts => ErrorKind::RateLimit,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::OAuthNotConfigured { .. } | AuthError::OAuthProvider { .. } => {
                ErrorKind::ExternalService
            }
            AuthError::App(e) => e.kind(),
            AuthError::Database(e) => classify_sqlx(e).0,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert to AppError, keeping the source chain
    pub fn into_app_error(self) -> AppError {
        let kind = self.kind();
        match self {
            AuthError::Validation { message, fields } => {
                let err = AppError::validation(message);
                if fields.is_empty() {
                    err
                } else {
                    err.with_details(serde_json::json!(fields))
                }
            }
            AuthError::Token(TokenError::Signing(_)) => AppError::internal("Failed to issue token"),
            AuthError::Token(e) => AppError::token("Invalid or expired token").with_source(e),
            AuthError::OAuthNotConfigured { provider } => {
                AppError::external_service(provider.service_name(), "OAuth is not configured")
            }
            AuthError::OAuthProvider { provider, message } => {
                AppError::external_service(provider.service_name(), &message)
            }
            AuthError::App(e) => e,
            AuthError::Database(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::internal(msg),
            other => AppError::new(kind, other.to_string()),
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::Token(TokenError::Signing(msg)) => {
                tracing::error!(message = %msg, "Token signing failed");
            }
            AuthError::App(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Auth internal error");
            }
            AuthError::OAuthProvider { provider, message } => {
                tracing::error!(provider = %provider, message = %message, "OAuth provider error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidTwoFactorCode => {
                tracing::warn!("Invalid 2FA code submitted");
            }
            AuthError::TooManyAttempts => {
                tracing::warn!("Login rate limit exceeded");
            }
            AuthError::Unauthorized(reason) => {
                tracing::warn!(reason = %reason, "Request rejected by authorization gate");
            }
            AuthError::InvalidRefreshToken => {
                tracing::warn!("Refresh rejected");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.into_app_error().into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.into_app_error()
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation {
            message: format!("Invalid request body: {}", rejection.body_text()),
            fields: Vec::new(),
        }
    }
}

impl From<QueryRejection> for AuthError {
    fn from(rejection: QueryRejection) -> Self {
        AuthError::Validation {
            message: format!("Invalid query string: {}", rejection.body_text()),
            fields: Vec::new(),
        }
    }
}
