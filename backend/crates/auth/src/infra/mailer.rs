//! Logging Mailer
//!
//! Writes the verification link to the log instead of sending mail.

use crate::domain::mailer::VerificationMailer;
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl VerificationMailer for LogMailer {
    async fn send_verification(&self, to: &Email, link: &str) -> AuthResult<()> {
        tracing::info!(to = %to, link = %link, "Verification email (not sent, logged only)");
        Ok(())
    }
}
