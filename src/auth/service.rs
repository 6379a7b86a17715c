//! Account operations: registration, credential checks, password changes and
//! the password reset token lifecycle.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use crate::config::AppConfig;
use crate::error::RepositoryError;
use crate::models::{Role, user};
use crate::repositories::{
    user::{NewUser, UserRepository},
    verification_token::VerificationTokenRepository,
};
use crate::validation::{is_valid_email, password_errors};

const RESET_TOKEN_BYTES: usize = 32;
const INVALID_RESET_TOKEN: &str = "Invalid or expired token";

/// Input for [`AuthService::create_user`].
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
}

/// A reset token as handed to the account owner. Only its digest is stored.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService<'a> {
    db: &'a DatabaseConnection,
    reset_ttl: Duration,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &AppConfig) -> Self {
        let ttl_seconds = i64::try_from(config.password_reset_ttl_seconds).unwrap_or(3600);
        Self {
            db,
            reset_ttl: Duration::seconds(ttl_seconds),
        }
    }

    fn users(&self) -> UserRepository<'a> {
        UserRepository::new(self.db)
    }

    fn tokens(&self) -> VerificationTokenRepository<'a> {
        VerificationTokenRepository::new(self.db)
    }

    /// Registers an account. The first failing password rule is reported.
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, RepositoryError> {
        if !is_valid_email(input.email.trim()) {
            return Err(RepositoryError::validation_error("Invalid email address"));
        }
        ensure_password_strength(&input.password)?;

        if self.users().find_by_email(&input.email).await?.is_some() {
            return Err(RepositoryError::conflict(
                "User with this email already exists",
            ));
        }

        let password_hash = hash_in_background(input.password).await?;

        let user = self
            .users()
            .create(NewUser {
                email: input.email,
                name: input.name.filter(|name| !name.trim().is_empty()),
                password_hash: Some(password_hash),
                role: input.role.unwrap_or_default(),
                tenant_id: input.tenant_id,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User account created");
        Ok(user)
    }

    /// Checks credentials. Every failure collapses to `None` so callers cannot
    /// tell which check rejected the attempt.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        tenant_id: Option<&str>,
    ) -> Result<Option<user::Model>, RepositoryError> {
        if email.trim().is_empty() || password.is_empty() {
            tracing::debug!("Login rejected: missing credentials");
            return Ok(None);
        }

        let Some(user) = self.users().find_by_email(email).await? else {
            tracing::debug!("Login rejected: unknown account");
            return Ok(None);
        };
        let Some(stored_hash) = user.password_hash.clone() else {
            tracing::debug!(user_id = %user.id, "Login rejected: account has no password");
            return Ok(None);
        };

        if let Some(requested) = tenant_id.map(str::trim).filter(|t| !t.is_empty()) {
            let matches = user
                .tenant_id
                .is_some_and(|own| own.to_string().eq_ignore_ascii_case(requested));
            if !matches {
                tracing::debug!(user_id = %user.id, "Login rejected: tenant mismatch");
                return Ok(None);
            }
        }

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login rejected: account disabled");
            return Ok(None);
        }

        let candidate = password.to_string();
        let valid = tokio::task::spawn_blocking(move || verify_password(&candidate, &stored_hash))
            .await
            .map_err(|err| RepositoryError::Internal(err.to_string()))?;

        if !valid {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Looks up an account by e-mail, optionally restricted to one tenant.
    pub async fn get_user_by_email(
        &self,
        email: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<Option<user::Model>, RepositoryError> {
        let user = self.users().find_by_email(email).await?;
        Ok(match tenant_id {
            Some(tenant_id) => user.filter(|u| u.tenant_id == Some(tenant_id)),
            None => user,
        })
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> Result<Option<user::Model>, RepositoryError> {
        self.users().find_by_id(id).await
    }

    pub async fn update_user_password(
        &self,
        user_id: Uuid,
        new_password: &str,
    ) -> Result<(), RepositoryError> {
        ensure_password_strength(new_password)?;
        let password_hash = hash_in_background(new_password.to_string()).await?;
        self.users()
            .update_password_hash(user_id, password_hash)
            .await?;
        tracing::info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    /// Changes the password of a signed-in user after re-checking the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), RepositoryError> {
        let user = self
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        let current_ok = match user.password_hash.clone() {
            Some(hash) => {
                let candidate = current_password.to_string();
                tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
                    .await
                    .map_err(|err| RepositoryError::Internal(err.to_string()))?
            }
            None => false,
        };
        if !current_ok {
            return Err(RepositoryError::validation_error(
                "Current password is incorrect",
            ));
        }

        self.update_user_password(user_id, new_password).await
    }

    /// Issues a single-use reset token for an existing account. Any earlier
    /// tokens for the same address are discarded.
    pub async fn generate_password_reset_token(
        &self,
        email: &str,
    ) -> Result<PasswordResetToken, RepositoryError> {
        let user = self
            .users()
            .find_by_email(email)
            .await?
            .ok_or_else(|| RepositoryError::validation_error("User not found"))?;

        let mut raw = [0u8; RESET_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let token = URL_SAFE_NO_PAD.encode(raw);
        let expires_at = Utc::now() + self.reset_ttl;

        let tokens = self.tokens();
        tokens.delete_for_identifier(&user.email).await?;
        tokens
            .insert(&user.email, digest_token(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, %expires_at, "Password reset token issued");
        Ok(PasswordResetToken { token, expires_at })
    }

    pub async fn verify_password_reset_token(
        &self,
        email: &str,
        token: &str,
    ) -> Result<(), RepositoryError> {
        let identifier = crate::repositories::user::normalize_email(email);
        let candidate = digest_token(token.trim());

        let stored = self.tokens().find_unexpired(&identifier, Utc::now()).await?;
        let matched = stored.iter().any(|record| {
            bool::from(record.token_hash.as_bytes().ct_eq(candidate.as_bytes()))
        });

        if matched {
            Ok(())
        } else {
            Err(RepositoryError::validation_error(INVALID_RESET_TOKEN))
        }
    }

    /// Sets a new password using a reset token, then burns the token.
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<(), RepositoryError> {
        self.verify_password_reset_token(email, token).await?;

        let user = self
            .users()
            .find_by_email(email)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        self.update_user_password(user.id, new_password).await?;
        self.tokens().delete_for_identifier(&user.email).await?;

        Ok(())
    }

    /// Removes reset tokens whose lifetime has passed.
    pub async fn purge_expired_tokens(&self) -> Result<u64, RepositoryError> {
        let removed = self.tokens().delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "Purged expired verification tokens");
        }
        Ok(removed)
    }
}

fn ensure_password_strength(password: &str) -> Result<(), RepositoryError> {
    match password_errors(password).first() {
        Some(first) => Err(RepositoryError::validation_error(*first)),
        None => Ok(()),
    }
}

async fn hash_in_background(password: String) -> Result<String, RepositoryError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| RepositoryError::Internal(err.to_string()))?
        .map_err(|err| RepositoryError::Internal(err.to_string()))
}

/// Hex SHA-256 of a reset token; the only form that is persisted.
pub fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
