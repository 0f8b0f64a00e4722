//! Entity Module

pub mod credentials;
pub mod email_verification;
pub mod revoked_token;
pub mod user;
