//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::{AuthAppState, AuthRepo};
pub use middleware::{AuthGate, ClientIp, TrustedProxies, require_auth};
pub use router::{PgAuthAppState, auth_router, pg_auth_state};
