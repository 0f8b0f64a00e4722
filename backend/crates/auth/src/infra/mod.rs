//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod google;
pub mod mailer;
pub mod memory;
pub mod postgres;

pub use google::GoogleOAuthClient;
pub use mailer::LogMailer;
pub use memory::InMemoryAuthRepository;
pub use postgres::PgAuthRepository;
