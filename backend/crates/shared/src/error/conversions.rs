//! Error conversions - From implementations for common error types
//!
//! Provides automatic conversion from common error types to [`AppError`].

use super::app_error::AppError;
#[cfg(feature = "sqlx")]
use super::kind::ErrorKind;

// ============================================================================
// Standard library conversions
// ============================================================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let app_err = match err.kind() {
            std::io::ErrorKind::NotFound => AppError::not_found("Resource not found"),
            std::io::ErrorKind::PermissionDenied => AppError::forbidden("Access denied"),
            _ => AppError::internal("I/O operation failed"),
        };
        app_err.with_source(err)
    }
}

impl From<std::string::FromUtf8Error> for AppError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        AppError::validation("Invalid UTF-8 string").with_source(err)
    }
}

// ============================================================================
// serde_json conversions
// ============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::validation(format!("JSON parse error: {}", err)).with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}

// ============================================================================
// SQLx conversions (feature-gated)
// ============================================================================

/// sqlx エラーの分類とメッセージ
///
/// `From<sqlx::Error>` と、sqlx エラーを内包する各クレートのエラー型で共有します。
#[cfg(feature = "sqlx")]
pub fn classify_sqlx(err: &sqlx::Error) -> (ErrorKind, &'static str) {
    match err {
        sqlx::Error::RowNotFound => (ErrorKind::NotFound, "Record not found"),
        sqlx::Error::PoolTimedOut => (
            ErrorKind::ExternalService,
            "Database service error: connection pool exhausted",
        ),
        sqlx::Error::Database(db_err) => {
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code().as_deref() {
                // Class 23: integrity constraint violation
                Some("23505") => (ErrorKind::Conflict, "Duplicate key value"),
                Some("23503") => (ErrorKind::Conflict, "Foreign key violation"),
                Some("23502") => (ErrorKind::Validation, "Required field is null"),
                Some("23514") => (ErrorKind::Database, "Check constraint violation"),
                // Class 53: insufficient resources, class 57: operator intervention
                Some(code) if code.starts_with("53") || code.starts_with("57") => (
                    ErrorKind::ExternalService,
                    "Database service error: unavailable",
                ),
                _ => (ErrorKind::Database, "Database error"),
            }
        }
        sqlx::Error::Io(_) => (
            ErrorKind::ExternalService,
            "Database service error: connection error",
        ),
        _ => (ErrorKind::Database, "Database error"),
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let (kind, message) = classify_sqlx(&err);
        AppError::new(kind, message).with_source(err)
    }
}

// ============================================================================
// Axum conversions (feature-gated)
// ============================================================================

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use super::envelope::ErrorEnvelope;
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorEnvelope::from_app_error(&self))).into_response()
    }
}
