//! OAuth Provider Trait
//!
//! Transport-independent view of an external identity provider.

use crate::domain::value_object::federation::FederationProvider;
use crate::error::AuthResult;

/// Profile returned by a provider after a successful code exchange
#[derive(Debug, Clone, Default)]
pub struct OAuthProfile {
    pub external_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[trait_variant::make(OAuthProvider: Send)]
pub trait LocalOAuthProvider {
    /// Which federation id column this provider fills
    fn provider(&self) -> FederationProvider;

    /// URL the browser is redirected to, carrying the CSRF `state`
    fn authorization_url(&self, state: &str) -> AuthResult<String>;

    /// Exchange an authorization code for the user's profile
    async fn fetch_profile(&self, code: &str) -> AuthResult<OAuthProfile>;
}
