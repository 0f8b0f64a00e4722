//! Federation Provider
//!
//! External identity providers a local account can be linked to.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// External identity provider
///
/// Each provider has its own unique external-id column on the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FederationProvider {
    #[display("google")]
    Google,
    #[display("apple")]
    Apple,
}

impl FederationProvider {
    /// Human-readable name used in external service errors
    pub fn service_name(&self) -> &'static str {
        match self {
            FederationProvider::Google => "Google",
            FederationProvider::Apple => "Apple",
        }
    }
}
