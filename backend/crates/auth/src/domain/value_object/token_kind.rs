//! Token Kind
//!
//! Distinguishes access tokens from refresh tokens.
//! Each kind is signed with its own secret.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind tag embedded in every issued token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[display("access")]
    Access,
    #[display("refresh")]
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("Unknown token kind: {}", other)),
        }
    }
}
