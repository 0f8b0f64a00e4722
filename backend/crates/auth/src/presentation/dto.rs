//! API DTOs (Data Transfer Objects)

use axum::extract::FromRequest;
use serde::{Deserialize, Serialize};

use crate::domain::entity::user::User;
use crate::domain::value_object::totp_secret::TotpProvisioning;
use crate::error::AuthError;

/// `Json` extractor whose rejection renders as an auth validation error
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct AppJson<T>(pub T);

// ============================================================================
// Envelope
// ============================================================================

/// Success envelope `{success: true, message, data?}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

// ============================================================================
// Register / Verify
// ============================================================================

/// Register request
///
/// Fields are optional so a missing one is reported per field instead of
/// as a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `GET /verify-email` query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
    /// Present in the emailed link, not used for the lookup
    pub email: Option<String>,
}

// ============================================================================
// Login / Refresh / Logout
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub two_factor_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Public user projection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id.to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
}

// ============================================================================
// Two-factor
// ============================================================================

/// 2FA enrollment response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorEnableResponse {
    /// QR code as `data:image/png;base64,...`
    #[serde(rename = "qrDataURL")]
    pub qr_data_url: String,
    /// Base32 secret for manual entry
    pub secret: String,
    pub otpauth_url: String,
}

impl From<TotpProvisioning> for TwoFactorEnableResponse {
    fn from(p: TotpProvisioning) -> Self {
        Self {
            qr_data_url: p.qr_data_url,
            secret: p.secret_base32,
            otpauth_url: p.otpauth_url,
        }
    }
}

// ============================================================================
// OAuth
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user cancels consent
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_camel_case() {
        let req: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "a@example.com",
            "password": "pw",
            "twoFactorCode": "123456"
        }))
        .unwrap();
        assert_eq!(req.two_factor_code.as_deref(), Some("123456"));
    }

    #[test]
    fn test_envelope_omits_missing_data() {
        let value = serde_json::to_value(ApiResponse::message("Logged out successfully")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "success": true, "message": "Logged out successfully" })
        );
    }

    #[test]
    fn test_two_factor_response_keys() {
        let value = serde_json::to_value(TwoFactorEnableResponse {
            qr_data_url: "data:image/png;base64,AAAA".to_string(),
            secret: "JBSWY3DPEHPK3PXP".to_string(),
            otpauth_url: "otpauth://totp/URA:a%40example.com".to_string(),
        })
        .unwrap();
        assert!(value.get("qrDataURL").is_some());
        assert!(value.get("otpauthUrl").is_some());
        assert!(value.get("secret").is_some());
    }
}
