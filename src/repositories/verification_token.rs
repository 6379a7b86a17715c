//! # Verification Token Repository
//!
//! Persists hashed one-time tokens keyed by identifier (the account e-mail).

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{
    VerificationToken,
    verification_token::{self, ActiveModel as TokenActiveModel, Model as TokenModel},
};

pub struct VerificationTokenRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VerificationTokenRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn insert(
        &self,
        identifier: &str,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<TokenModel, RepositoryError> {
        TokenActiveModel {
            id: Set(Uuid::new_v4()),
            identifier: Set(identifier.to_string()),
            token_hash: Set(token_hash),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// Tokens for `identifier` that expire after `now`.
    pub async fn find_unexpired(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<TokenModel>, RepositoryError> {
        VerificationToken::find()
            .filter(verification_token::Column::Identifier.eq(identifier))
            .filter(verification_token::Column::ExpiresAt.gt(now))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete_for_identifier(&self, identifier: &str) -> Result<u64, RepositoryError> {
        let result = VerificationToken::delete_many()
            .filter(verification_token::Column::Identifier.eq(identifier))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = VerificationToken::delete_many()
            .filter(verification_token::Column::ExpiresAt.lte(now))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
