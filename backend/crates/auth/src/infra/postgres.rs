//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{
    credentials::StoredCredentials,
    email_verification::EmailVerification,
    revoked_token::RevokedToken,
    user::{TwoFactor, User},
};
use crate::domain::repository::{RevokedTokenRepository, UserRepository};
use crate::domain::value_object::{
    email::Email, federation::FederationProvider, totp_secret::TotpSecret, user_id::UserId,
    user_password::UserPassword,
};
use crate::error::{AuthError, AuthResult};

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// `SELECT <user columns> FROM users` followed by the given clause
macro_rules! select_user {
    ($($clause:literal)?) => {
        concat!(
            r#"
            SELECT
                id,
                email,
                google_id,
                apple_id,
                first_name,
                last_name,
                profile_picture,
                email_verified,
                email_verification_token_hash,
                email_verification_expires_at,
                two_factor_enabled,
                two_factor_secret,
                last_login_at,
                created_at,
                updated_at
            "#,
            $($clause)?
        )
    };
}

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.is_unique_violation() && db.constraint() == Some(constraint)
    )
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn create(&self, user: &User, password: Option<&UserPassword>) -> AuthResult<()> {
        let (token_hash, token_expires_at) = match &user.email_verification {
            Some(v) => (Some(v.token_hash.as_str()), Some(v.expires_at)),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO users (
                id,
                email,
                password_hash,
                google_id,
                apple_id,
                first_name,
                last_name,
                profile_picture,
                email_verified,
                email_verification_token_hash,
                email_verification_expires_at,
                two_factor_enabled,
                two_factor_secret,
                last_login_at,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(password.map(UserPassword::as_phc_string))
        .bind(user.google_id.as_deref())
        .bind(user.apple_id.as_deref())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.profile_picture.as_deref())
        .bind(user.email_verified)
        .bind(token_hash)
        .bind(token_expires_at)
        .bind(user.two_factor.is_enabled())
        .bind(user.two_factor.secret().map(TotpSecret::as_base32))
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e, EMAIL_UNIQUE_CONSTRAINT) => Err(AuthError::EmailTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(select_user!("FROM users WHERE id = $1"))
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(select_user!("FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> AuthResult<Option<StoredCredentials>> {
        let row = sqlx::query_as::<_, CredentialsRow>(select_user!(
            ", password_hash FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialsRow::into_credentials).transpose()
    }

    async fn find_by_federated_id(
        &self,
        provider: FederationProvider,
        external_id: &str,
    ) -> AuthResult<Option<User>> {
        let sql = match provider {
            FederationProvider::Google => select_user!("FROM users WHERE google_id = $1"),
            FederationProvider::Apple => select_user!("FROM users WHERE apple_id = $1"),
        };

        let row = sqlx::query_as::<_, UserRow>(sql)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn find_by_verification_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(select_user!(
            "FROM users WHERE email_verification_token_hash = $1 AND email_verification_expires_at > $2"
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn mark_email_verified(&self, user_id: &UserId) -> AuthResult<()> {
        let affected = sqlx::query(
            r#"
            UPDATE users SET
                email_verified = TRUE,
                email_verification_token_hash = NULL,
                email_verification_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn link_federated_id(
        &self,
        user_id: &UserId,
        provider: FederationProvider,
        external_id: &str,
        avatar: Option<&str>,
    ) -> AuthResult<()> {
        let sql = match provider {
            FederationProvider::Google => {
                r#"
                UPDATE users SET
                    google_id = $2,
                    email_verified = TRUE,
                    profile_picture = COALESCE(profile_picture, $3),
                    updated_at = NOW()
                WHERE id = $1
                "#
            }
            FederationProvider::Apple => {
                r#"
                UPDATE users SET
                    apple_id = $2,
                    email_verified = TRUE,
                    profile_picture = COALESCE(profile_picture, $3),
                    updated_at = NOW()
                WHERE id = $1
                "#
            }
        };

        let affected = sqlx::query(sql)
            .bind(user_id.as_uuid())
            .bind(external_id)
            .bind(avatar)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn record_login(&self, user_id: &UserId, at: DateTime<Utc>) -> AuthResult<()> {
        let affected =
            sqlx::query("UPDATE users SET last_login_at = $2, updated_at = $2 WHERE id = $1")
                .bind(user_id.as_uuid())
                .bind(at)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if affected == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn set_two_factor(
        &self,
        user_id: &UserId,
        secret: Option<&TotpSecret>,
    ) -> AuthResult<()> {
        let affected = sqlx::query(
            r#"
            UPDATE users SET
                two_factor_enabled = $2,
                two_factor_secret = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(secret.is_some())
        .bind(secret.map(TotpSecret::as_base32))
        .execute(&self.pool)
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Revoked Token Repository Implementation
// ============================================================================

impl RevokedTokenRepository for PgAuthRepository {
    async fn revoke(&self, entry: &RevokedToken) -> AuthResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, kind, user_id, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(&entry.token)
        .bind(entry.kind.as_str())
        .bind(entry.user_id.as_uuid())
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> AuthResult<bool> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token = $1)",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await?;

        Ok(revoked)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    google_id: Option<String>,
    apple_id: Option<String>,
    first_name: String,
    last_name: String,
    profile_picture: Option<String>,
    email_verified: bool,
    email_verification_token_hash: Option<String>,
    email_verification_expires_at: Option<DateTime<Utc>>,
    two_factor_enabled: bool,
    two_factor_secret: Option<String>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let two_factor = match (self.two_factor_enabled, self.two_factor_secret) {
            (true, Some(secret)) => TwoFactor::Enabled(TotpSecret::from_base32(secret)?),
            (false, None) => TwoFactor::Disabled,
            _ => {
                return Err(AuthError::Internal(format!(
                    "Inconsistent two-factor state for user {}",
                    self.id
                )));
            }
        };

        let email_verification = match (
            self.email_verification_token_hash,
            self.email_verification_expires_at,
        ) {
            (Some(token_hash), Some(expires_at)) => Some(EmailVerification {
                token_hash,
                expires_at,
            }),
            _ => None,
        };

        Ok(User {
            user_id: UserId::from_uuid(self.id),
            email: Email::from_db(self.email),
            google_id: self.google_id,
            apple_id: self.apple_id,
            first_name: self.first_name,
            last_name: self.last_name,
            profile_picture: self.profile_picture,
            email_verified: self.email_verified,
            email_verification,
            two_factor,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: Option<String>,
}

impl CredentialsRow {
    fn into_credentials(self) -> AuthResult<StoredCredentials> {
        let password_hash = self
            .password_hash
            .map(UserPassword::from_phc_string)
            .transpose()?;

        Ok(StoredCredentials {
            user: self.user.into_user()?,
            password_hash,
        })
    }
}
