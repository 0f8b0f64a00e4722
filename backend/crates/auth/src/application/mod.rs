//! Application Layer
//!
//! Use cases and application services.

pub mod authorize;
pub mod config;
pub mod credentials;
pub mod oauth_resolve;
pub mod oauth_sign_in;
pub mod oauth_state;
pub mod refresh;
pub mod revocation_sweep;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod token;
pub mod two_factor;
pub mod verify_email;

// Re-exports
pub use authorize::{AuthContext, AuthorizeUseCase};
pub use config::{AuthConfig, ConfigError};
pub use credentials::CredentialVerifier;
pub use oauth_resolve::OAuthResolver;
pub use oauth_sign_in::{OAuthSignInOutput, OAuthSignInUseCase};
pub use oauth_state::OAuthStateStore;
pub use refresh::RefreshUseCase;
pub use revocation_sweep::{purge_once, spawn_revocation_sweep};
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use token::{IssuedToken, TokenService, VerifiedToken};
pub use two_factor::TwoFactorUseCase;
pub use verify_email::VerifyEmailUseCase;
