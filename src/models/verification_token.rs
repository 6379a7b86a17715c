//! # Verification Token Model
//!
//! Password reset tokens. The raw token is only ever handed to the user; the
//! table keeps its SHA-256 digest.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "verification_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// E-mail address the token was issued for
    pub identifier: String,

    /// Hex-encoded SHA-256 of the token
    #[sea_orm(unique)]
    pub token_hash: String,

    pub expires_at: chrono::DateTime<chrono::Utc>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
