//! Person Name Value Object
//!
//! First or last name entered at registration.

use kernel::error::app_error::{AppError, AppResult};

/// Maximum name length in characters
pub const PERSON_NAME_MAX_LENGTH: usize = 100;

/// Trimmed, non-empty personal name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    /// Validate a name; `label` is used in the error message ("First name")
    pub fn new(raw: &str, label: &str) -> AppResult<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation(format!("{} is required", label)));
        }

        if trimmed.chars().count() > PERSON_NAME_MAX_LENGTH
            || trimmed.chars().any(|c| c.is_control())
        {
            return Err(AppError::validation(format!(
                "{} must be between 1 and {} characters",
                label, PERSON_NAME_MAX_LENGTH
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
