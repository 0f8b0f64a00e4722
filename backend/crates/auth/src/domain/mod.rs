//! Domain Layer
//!
//! Contains entities, value objects, repository and collaborator traits.

pub mod entity;
pub mod mailer;
pub mod oauth;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    credentials::StoredCredentials, revoked_token::RevokedToken, user::TwoFactor, user::User,
};
pub use mailer::VerificationMailer;
pub use oauth::{OAuthProfile, OAuthProvider};
pub use repository::{RevokedTokenRepository, UserRepository};
