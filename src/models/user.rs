//! User entity model
//!
//! Users authenticate with e-mail and password. The password hash is absent
//! for accounts that were created through an external identity provider.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use super::enums::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique, stored lower-cased
    #[sea_orm(unique)]
    pub email: String,

    pub name: Option<String>,

    /// Argon2 PHC string
    pub password_hash: Option<String>,

    pub image: Option<String>,

    pub role: Role,

    /// Owning tenant; `None` for super administrators and global shoppers
    pub tenant_id: Option<Uuid>,

    pub email_verified_at: Option<chrono::DateTime<chrono::Utc>>,

    pub is_active: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "SetNull"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
