//! Sign Up Use Case
//!
//! Registers a password account and sends the verification link.

use std::sync::Arc;

use kernel::error::app_error::AppResult;

use crate::application::config::AuthConfig;
use crate::domain::entity::{email_verification::EmailVerification, user::User};
use crate::domain::mailer::VerificationMailer;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email,
    person_name::PersonName,
    user_id::UserId,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult, FieldIssue};

/// Sign up input
#[derive(Debug, Default)]
pub struct SignUpInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Sign up output
pub struct SignUpOutput {
    pub user_id: UserId,
}

fn check<T>(issues: &mut Vec<FieldIssue>, field: &str, result: AppResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            issues.push(FieldIssue::new(field, e.message()));
            None
        }
    }
}

/// Build `${APP_URL}/verify-email?email=..&token=..`
pub fn verification_link(app_url: &str, email: &Email, token: &str) -> AuthResult<String> {
    url::Url::parse_with_params(
        &format!("{}/verify-email", app_url),
        &[("email", email.as_str()), ("token", token)],
    )
    .map(String::from)
    .map_err(|e| AuthError::Internal(format!("Invalid verification link: {}", e)))
}

/// Sign up use case
pub struct SignUpUseCase<U, M>
where
    U: UserRepository,
    M: VerificationMailer,
{
    user_repo: Arc<U>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<U, M> SignUpUseCase<U, M>
where
    U: UserRepository,
    M: VerificationMailer,
{
    pub fn new(user_repo: Arc<U>, mailer: Arc<M>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            mailer,
            config,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let mut issues = Vec::new();
        let first_name = check(
            &mut issues,
            "firstName",
            PersonName::new(&input.first_name, "First name"),
        );
        let last_name = check(
            &mut issues,
            "lastName",
            PersonName::new(&input.last_name, "Last name"),
        );
        let email = check(&mut issues, "email", Email::new(input.email));
        let password = check(&mut issues, "password", RawPassword::new(input.password));

        let (Some(first_name), Some(last_name), Some(email), Some(password)) =
            (first_name, last_name, email, password)
        else {
            return Err(AuthError::invalid_fields(issues));
        };

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let config = self.config.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || UserPassword::from_raw(&password, config.pepper()))
                .await
                .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))??;

        let ttl = chrono::Duration::from_std(self.config.email_verification_ttl)
            .map_err(|_| AuthError::Internal("Verification lifetime out of range".to_string()))?;
        let (token, verification) = EmailVerification::issue(ttl);

        let user = User::new_local(
            email,
            first_name.into_inner(),
            last_name.into_inner(),
            verification,
        );
        self.user_repo.create(&user, Some(&password_hash)).await?;

        let link = verification_link(&self.config.app_url, &user.email, &token)?;
        if let Err(e) = self.mailer.send_verification(&user.email, &link).await {
            tracing::error!(user_id = %user.user_id, error = %e, "Failed to send verification email");
        }

        tracing::info!(user_id = %user.user_id, "User registered");
        Ok(SignUpOutput {
            user_id: user.user_id,
        })
    }
}
