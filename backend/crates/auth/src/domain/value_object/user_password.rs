//! User Password Value Object
//!
//! Domain wrappers over `platform::password`.
//! `RawPassword` is user input (zeroized on drop), `UserPassword` is the
//! Argon2id PHC string that is safe to persist.

use kernel::error::app_error::{AppError, AppResult, ResultExt};
use kernel::error::kind::ErrorKind;
use platform::password::{
    ClearTextPassword, HashedPassword, PasswordHashError, PasswordPolicyError,
};
use std::fmt;

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Raw password from user input
///
/// Memory is automatically zeroized when dropped.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Create a new raw password, enforcing the registration policy
    ///
    /// ## Validation Rules
    /// - 8 to 128 characters
    /// - At least one lowercase, uppercase, digit and one of `@$!%*?&`
    /// - No control characters
    /// - No well-known weak passwords or keyboard runs
    ///
    /// ## Errors
    /// Returns a validation `AppError` whose message is safe to show per field
    pub fn new(raw: String) -> AppResult<Self> {
        let clear_text = ClearTextPassword::new(raw).map_err(|e| match e {
            PasswordPolicyError::TooShort { min, .. } => AppError::validation(format!(
                "Password must be at least {} characters long",
                min
            )),
            PasswordPolicyError::TooLong { max, .. } => AppError::validation(format!(
                "Password must be at most {} characters long",
                max
            )),
            other => AppError::validation(other.to_string()),
        })?;

        Ok(Self(clear_text))
    }

    /// Wrap a password submitted at login
    ///
    /// No policy is applied: a password that predates a policy change must
    /// still be comparable against its stored hash.
    pub fn submitted(raw: String) -> Self {
        Self(ClearTextPassword::for_verification(raw))
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Hashed user password for database storage
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    /// Hash a validated raw password
    ///
    /// ## Arguments
    /// * `raw` - The validated raw password
    /// * `pepper` - Optional application-wide secret
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AppResult<Self> {
        let hashed = raw.inner().hash(pepper).map_err(|e| match e {
            PasswordHashError::HashingFailed(msg) => {
                AppError::internal(format!("Password hashing failed: {}", msg))
            }
            PasswordHashError::InvalidHashFormat => {
                AppError::internal("Unexpected error during password hashing")
            }
        })?;

        Ok(Self(hashed))
    }

    /// Restore from a stored PHC string
    pub fn from_phc_string(phc_string: impl Into<String>) -> AppResult<Self> {
        HashedPassword::from_phc_string(phc_string)
            .map(Self)
            .map_app_err(ErrorKind::Internal, "Invalid password hash in database")
    }

    /// Get PHC string for database storage
    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    /// Verify a raw password against this hash
    ///
    /// ## Arguments
    /// * `raw` - The submitted password
    /// * `pepper` - Must match the pepper used during hashing
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(raw.inner(), pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_password_policy() {
        assert!(RawPassword::new("Str0ng!Passw0rd".to_string()).is_ok());

        let err = RawPassword::new("Sh0rt!".to_string()).unwrap_err();
        assert_eq!(err.message(), "Password must be at least 8 characters long");

        let err = RawPassword::new("alllowercase1!".to_string()).unwrap_err();
        assert_eq!(
            err.message(),
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character"
        );

        let err = RawPassword::new(String::new()).unwrap_err();
        assert_eq!(err.message(), "Password is required");
    }

    #[test]
    fn test_submitted_skips_policy() {
        let submitted = RawPassword::submitted("weak".to_string());
        let debug = format!("{:?}", submitted);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("weak"));
    }

    #[test]
    fn test_hash_and_verify() {
        let raw = RawPassword::new("MySecure#Pass2024!".to_string()).unwrap();
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        assert!(hashed.verify(&RawPassword::submitted("MySecure#Pass2024!".to_string()), None));
        assert!(!hashed.verify(&RawPassword::submitted("MySecure#Pass2025!".to_string()), None));
    }

    #[test]
    fn test_hash_with_pepper() {
        let raw = RawPassword::new("MySecure#Pass2024!".to_string()).unwrap();
        let pepper = b"app_secret_pepper";
        let hashed = UserPassword::from_raw(&raw, Some(pepper)).unwrap();

        assert!(hashed.verify(&raw, Some(pepper)));
        assert!(!hashed.verify(&raw, None));
        assert!(!hashed.verify(&raw, Some(b"wrong")));
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let raw = RawPassword::new("MySecure#Pass2024!".to_string()).unwrap();
        let hashed = UserPassword::from_raw(&raw, None).unwrap();

        let restored = UserPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&raw, None));

        assert!(UserPassword::from_phc_string("not-a-phc-string").is_err());
    }
}
