//! Order entity model
//!
//! Monetary columns are computed once at checkout and never recomputed from
//! the live catalog.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use super::enums::{OrderStatus, PaymentStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// Purchasing account; cleared if the account is removed
    pub user_id: Option<Uuid>,

    /// Human-facing number such as `ORD-123456-ABCDEF`
    #[sea_orm(unique)]
    pub order_number: String,

    pub customer_email: String,

    pub status: OrderStatus,

    pub payment_status: PaymentStatus,

    pub subtotal: f64,
    pub tax_amount: f64,
    pub shipping_amount: f64,
    pub discount_amount: f64,
    pub total: f64,

    #[sea_orm(column_type = "JsonBinary")]
    pub shipping_address: Json,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub billing_address: Option<Json>,

    pub payment_method: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_method: Option<String>,
    pub shipped_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub customer_notes: Option<String>,
    pub admin_notes: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
