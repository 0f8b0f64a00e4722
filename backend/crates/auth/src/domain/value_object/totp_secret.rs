//! TOTP Secret Value Object
//!
//! Shared secret for time-based one-time codes.
//! Google Authenticator compatible: SHA1, 6 digits, 30 second step.

use kernel::error::app_error::{AppError, AppResult};
use totp_rs::{Algorithm, Secret, TOTP};

const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
/// Accepted drift either side of the current step
const TOTP_SKEW_STEPS: u8 = 1;

const QR_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Stands in for `:` in labels, which separates issuer and account in otpauth URLs
const LABEL_COLON_REPLACEMENT: &str = "_";

/// TOTP secret for two-factor authentication
///
/// Debug output never includes the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct TotpSecret {
    /// Base32-encoded secret
    secret_base32: String,
}

/// Everything an authenticator app needs to enroll
#[derive(Debug, Clone)]
pub struct TotpProvisioning {
    pub secret_base32: String,
    pub otpauth_url: String,
    pub qr_data_url: String,
}

impl TotpSecret {
    /// Generate a new random 160-bit secret
    pub fn generate() -> Self {
        Self {
            secret_base32: Secret::generate_secret().to_encoded().to_string(),
        }
    }

    /// Restore from a stored base32 string
    pub fn from_base32(secret: impl Into<String>) -> AppResult<Self> {
        let secret_base32 = secret.into();
        Secret::Encoded(secret_base32.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {:?}", e)))?;

        Ok(Self { secret_base32 })
    }

    /// Get the base32-encoded secret for storage
    pub fn as_base32(&self) -> &str {
        &self.secret_base32
    }

    fn to_totp(&self, issuer: Option<&str>, account_name: &str) -> AppResult<TOTP> {
        let bytes = Secret::Encoded(self.secret_base32.clone())
            .to_bytes()
            .map_err(|e| AppError::internal(format!("Invalid TOTP secret: {:?}", e)))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW_STEPS,
            TOTP_STEP,
            bytes,
            issuer.map(str::to_string),
            account_name.to_string(),
        )
        .map_err(|e| AppError::internal(format!("Failed to create TOTP: {}", e)))
    }

    /// Check a code against the given unix time (seconds), allowing ±1 step
    pub fn verify_at(&self, code: &str, unix_time: u64) -> AppResult<bool> {
        let code = code.trim();
        if code.len() != TOTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let totp = self.to_totp(None, "")?;
        Ok(totp.check(code, unix_time))
    }

    /// Check a code against the current time
    pub fn verify(&self, code: &str) -> AppResult<bool> {
        self.verify_at(code, unix_now())
    }

    /// Code for the given unix time
    pub fn generate_at(&self, unix_time: u64) -> AppResult<String> {
        Ok(self.to_totp(None, "")?.generate(unix_time))
    }

    /// Build the otpauth URL and a scannable QR data URL
    ///
    /// Colons in the issuer or account name are replaced; the label is
    /// display-only and the secret is unaffected.
    pub fn provisioning(&self, issuer: &str, account_name: &str) -> AppResult<TotpProvisioning> {
        let issuer = label_part(issuer);
        let totp = self.to_totp(Some(&issuer), &label_part(account_name))?;

        let qr = totp
            .get_qr_base64()
            .map_err(|e| AppError::internal(format!("Failed to generate QR code: {}", e)))?;
        let qr_data_url = if qr.starts_with("data:") {
            qr
        } else {
            format!("{}{}", QR_DATA_URL_PREFIX, qr)
        };

        Ok(TotpProvisioning {
            secret_base32: self.secret_base32.clone(),
            otpauth_url: totp.get_url(),
            qr_data_url,
        })
    }
}

impl std::fmt::Debug for TotpSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpSecret")
            .field("secret_base32", &"[REDACTED]")
            .finish()
    }
}

fn label_part(value: &str) -> String {
    value.replace(':', LABEL_COLON_REPLACEMENT)
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn test_generate_and_restore() {
        let secret = TotpSecret::generate();
        assert!(!secret.as_base32().is_empty());

        let restored = TotpSecret::from_base32(secret.as_base32()).unwrap();
        assert_eq!(secret, restored);
    }

    #[test]
    fn test_verify_current_step() {
        let secret = TotpSecret::generate();
        let code = secret.generate_at(NOW).unwrap();
        assert!(secret.verify_at(&code, NOW).unwrap());
    }

    #[test]
    fn test_verify_window_is_one_step() {
        let secret = TotpSecret::generate();
        let previous = secret.generate_at(NOW - TOTP_STEP).unwrap();
        let stale = secret.generate_at(NOW - 3 * TOTP_STEP).unwrap();

        assert!(secret.verify_at(&previous, NOW).unwrap());
        // A code from three steps back could collide by chance only if equal
        if stale != secret.generate_at(NOW).unwrap()
            && stale != previous
            && stale != secret.generate_at(NOW + TOTP_STEP).unwrap()
        {
            assert!(!secret.verify_at(&stale, NOW).unwrap());
        }
    }

    #[test]
    fn test_verify_rejects_malformed_codes() {
        let secret = TotpSecret::generate();
        assert!(!secret.verify_at("", NOW).unwrap());
        assert!(!secret.verify_at("12345", NOW).unwrap());
        assert!(!secret.verify_at("abcdef", NOW).unwrap());
    }

    #[test]
    fn test_provisioning() {
        let secret = TotpSecret::generate();
        let provisioning = secret.provisioning("URA", "user@example.com").unwrap();

        assert_eq!(provisioning.secret_base32, secret.as_base32());
        assert!(provisioning.otpauth_url.starts_with("otpauth://totp/"));
        assert!(provisioning.otpauth_url.contains("issuer=URA"));
        assert!(provisioning.qr_data_url.starts_with(QR_DATA_URL_PREFIX));
    }

    #[test]
    fn test_provisioning_accepts_colons_in_labels() {
        let secret = TotpSecret::generate();
        let provisioning = secret.provisioning("URA:dev", "a:b@example.com").unwrap();

        assert!(provisioning.otpauth_url.contains("a_b%40example.com"));
        assert!(provisioning.otpauth_url.contains("issuer=URA_dev"));

        let code = secret.generate_at(NOW).unwrap();
        assert!(secret.verify_at(&code, NOW).unwrap());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = TotpSecret::generate();
        let debug = format!("{:?}", secret);
        assert!(!debug.contains(secret.as_base32()));
    }
}
