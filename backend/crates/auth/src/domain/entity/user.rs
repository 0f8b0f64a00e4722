//! User Entity
//!
//! The identity record the auth core reads and writes.
//! The password hash is not part of this struct. It only
//! travels inside [`StoredCredentials`](super::credentials::StoredCredentials).

use chrono::{DateTime, Utc};

use crate::domain::entity::email_verification::EmailVerification;
use crate::domain::value_object::{
    email::Email, federation::FederationProvider, totp_secret::TotpSecret, user_id::UserId,
};

/// Two-factor state
///
/// The secret exists exactly when two-factor is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TwoFactor {
    #[default]
    Disabled,
    Enabled(TotpSecret),
}

impl TwoFactor {
    pub fn is_enabled(&self) -> bool {
        matches!(self, TwoFactor::Enabled(_))
    }

    pub fn secret(&self) -> Option<&TotpSecret> {
        match self {
            TwoFactor::Enabled(secret) => Some(secret),
            TwoFactor::Disabled => None,
        }
    }
}

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    /// Internal UUID identifier
    pub user_id: UserId,
    /// Unique, lowercased email
    pub email: Email,
    /// Google account id, unique when present
    pub google_id: Option<String>,
    /// Apple account id, unique when present
    pub apple_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub email_verified: bool,
    /// Pending verification token (hash only)
    pub email_verification: Option<EmailVerification>,
    pub two_factor: TwoFactor,
    /// Last successful login time
    pub last_login_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Profile fields taken from an identity provider
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub provider: FederationProvider,
    pub external_id: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
}

impl User {
    /// Create a password account awaiting email verification
    pub fn new_local(
        email: Email,
        first_name: String,
        last_name: String,
        verification: EmailVerification,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            google_id: None,
            apple_id: None,
            first_name,
            last_name,
            profile_picture: None,
            email_verified: false,
            email_verification: Some(verification),
            two_factor: TwoFactor::Disabled,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an account from a provider profile
    ///
    /// The provider has verified the email, so the record starts verified.
    /// Such a record never carries a password.
    pub fn new_federated(profile: FederatedProfile) -> Self {
        let now = Utc::now();
        let mut user = Self {
            user_id: UserId::new(),
            email: profile.email,
            google_id: None,
            apple_id: None,
            first_name: profile.first_name,
            last_name: profile.last_name,
            profile_picture: profile.profile_picture,
            email_verified: true,
            email_verification: None,
            two_factor: TwoFactor::Disabled,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        user.set_federated_id(profile.provider, profile.external_id);
        user
    }

    /// External id for a provider, if linked
    pub fn federated_id(&self, provider: FederationProvider) -> Option<&str> {
        match provider {
            FederationProvider::Google => self.google_id.as_deref(),
            FederationProvider::Apple => self.apple_id.as_deref(),
        }
    }

    pub fn has_federation(&self) -> bool {
        self.google_id.is_some() || self.apple_id.is_some()
    }

    fn set_federated_id(&mut self, provider: FederationProvider, external_id: String) {
        match provider {
            FederationProvider::Google => self.google_id = Some(external_id),
            FederationProvider::Apple => self.apple_id = Some(external_id),
        }
    }

    /// Link a provider identity to this record
    ///
    /// Marks the email verified and backfills the avatar only when absent.
    pub fn link_federation(
        &mut self,
        provider: FederationProvider,
        external_id: String,
        avatar: Option<String>,
    ) {
        self.set_federated_id(provider, external_id);
        self.email_verified = true;
        if self.profile_picture.is_none() {
            self.profile_picture = avatar;
        }
        self.updated_at = Utc::now();
    }

    /// Mark the email verified and drop the pending token
    pub fn mark_email_verified(&mut self) {
        self.email_verified = true;
        self.email_verification = None;
        self.updated_at = Utc::now();
    }

    /// Record successful login
    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login_at = Some(at);
        self.updated_at = at;
    }

    pub fn is_two_factor_enabled(&self) -> bool {
        self.two_factor.is_enabled()
    }

    /// Replace the two-factor state as a single transition
    pub fn set_two_factor(&mut self, two_factor: TwoFactor) {
        self.two_factor = two_factor;
        self.updated_at = Utc::now();
    }
}
