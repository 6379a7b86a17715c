//! Product entity model
//!
//! Prices are stored as double precision in the store currency. Inventory is
//! only enforced when `track_inventory` is set.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub category_id: Option<Uuid>,

    pub name: String,

    /// Unique per tenant
    pub slug: String,

    pub description: Option<String>,

    pub price: f64,

    /// Original price shown struck through
    pub compare_price: Option<f64>,

    pub sku: Option<String>,

    pub barcode: Option<String>,

    pub stock: i32,

    pub low_stock_threshold: i32,

    pub track_inventory: bool,

    /// Shipping weight in kilograms
    pub weight: Option<f64>,

    /// JSON array of image URLs
    #[sea_orm(column_type = "JsonBinary")]
    pub images: Json,

    pub is_active: bool,

    pub is_featured: bool,

    pub meta_title: Option<String>,

    pub meta_description: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id",
        on_delete = "Cascade"
    )]
    Tenant,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Image URLs, ignoring any non-string entries in the stored array.
    pub fn image_urls(&self) -> Vec<String> {
        self.images
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
