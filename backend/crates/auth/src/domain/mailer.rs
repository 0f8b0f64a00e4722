//! Verification Mailer Trait

use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// Delivers the email verification link
#[trait_variant::make(VerificationMailer: Send)]
pub trait LocalVerificationMailer {
    /// `link` already embeds the clear token
    async fn send_verification(&self, to: &Email, link: &str) -> AuthResult<()>;
}
