//! User ID
//!
//! Typed UUID identifying a user record.

use kernel::id::{Id, markers};

/// Internal user identifier (UUIDv4)
pub type UserId = Id<markers::User>;
