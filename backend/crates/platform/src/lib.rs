//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (random tokens, SHA-256)
//! - Password hashing (Argon2id) and registration policy
//! - Client identification (bearer token, client IP)
//! - Rate limiting infrastructure

pub mod client;
pub mod crypto;
pub mod password;
pub mod rate_limit;
