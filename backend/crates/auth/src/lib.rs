//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository and collaborator traits
//! - `application/` - Use cases, token service, configuration
//! - `infra/` - PostgreSQL / in-memory repositories, Google OAuth, mailer
//! - `presentation/` - HTTP handlers, DTOs, Authorization Gate, router
//!
//! ## Features
//! - Email + password registration with email verification
//! - Stateless JWT access / refresh tokens (HS256, separate secrets)
//! - Token revocation on logout, with a periodic sweep of expired entries
//! - TOTP-based 2FA (Google Authenticator compatible)
//! - Google sign-in with account linking by email
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optional pepper
//! - Uniform "Invalid credentials" and equalised timing for unknown emails
//! - Access and refresh tokens are not interchangeable
//! - The gate fails closed when the revocation store is unreachable
//! - Login attempts rate limited per client address and email

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::{AuthConfig, ConfigError};
pub use application::revocation_sweep::{purge_once, spawn_revocation_sweep};
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::{PgAuthAppState, auth_router, pg_auth_state};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
