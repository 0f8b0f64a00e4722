//! Value Object Module

pub mod email;
pub mod federation;
pub mod person_name;
pub mod token_kind;
pub mod totp_secret;
pub mod user_id;
pub mod user_password;
