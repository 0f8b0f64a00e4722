//! Stored Credentials
//!
//! A user record together with its password hash. Only the credential
//! lookup returns this; every other query leaves the hash out.

use crate::domain::entity::user::User;
use crate::domain::value_object::user_password::UserPassword;

#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    /// Absent for accounts created through a federation provider
    pub password_hash: Option<UserPassword>,
}
