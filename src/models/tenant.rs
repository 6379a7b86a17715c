//! Tenant entity model
//!
//! This module contains the SeaORM entity model for the tenants table.
//! Each tenant is an independent store with its own catalog and orders.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::commerce::{DEFAULT_SHIPPING_COST, DEFAULT_TAX_RATE_PERCENT, FREE_SHIPPING_THRESHOLD};
use crate::formatting::DEFAULT_CURRENCY;

/// Tenant entity representing a single store
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the store
    pub name: String,

    /// URL-safe unique handle
    pub slug: String,

    /// Custom domain, if any
    pub domain: Option<String>,

    pub description: Option<String>,

    pub logo: Option<String>,

    /// Store settings document, see [`StoreSettings`]
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub settings: Option<Json>,

    /// Plan key: free, starter or professional
    pub subscription_tier: String,

    /// active, past_due, cancelled, ...
    pub subscription_status: String,

    /// Plan limits; -1 means unlimited
    pub max_products: i32,
    pub max_customers: i32,
    pub max_storage_mb: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether another product may be created under the tenant's plan.
    pub fn allows_more_products(&self, current: u64) -> bool {
        self.max_products < 0 || current < self.max_products as u64
    }

    /// Typed view of the settings document; missing keys take their defaults.
    pub fn store_settings(&self) -> StoreSettings {
        self.settings
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.subscription_status == "active"
    }
}

/// Per-store commerce settings kept in `tenants.settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// ISO currency code used for display
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Sales tax in percent
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_shipping_flat_rate")]
    pub shipping_flat_rate: f64,
    /// Orders at or above this subtotal ship free
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: f64,
    /// Keys this service does not interpret are kept as-is.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_name: None,
            contact_email: None,
            currency: default_currency(),
            tax_rate: default_tax_rate(),
            shipping_flat_rate: default_shipping_flat_rate(),
            free_shipping_threshold: default_free_shipping_threshold(),
            extra: serde_json::Map::new(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE_PERCENT
}

fn default_shipping_flat_rate() -> f64 {
    DEFAULT_SHIPPING_COST
}

fn default_free_shipping_threshold() -> f64 {
    FREE_SHIPPING_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(settings: Option<Json>, max_products: i32) -> Model {
        let now = chrono::Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "Demo".to_string(),
            slug: "demo".to_string(),
            domain: None,
            description: None,
            logo: None,
            settings,
            subscription_tier: "free".to_string(),
            subscription_status: "active".to_string(),
            max_products,
            max_customers: 100,
            max_storage_mb: 100,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_store_settings_defaults() {
        let settings = tenant(None, 10).store_settings();
        assert_eq!(settings.currency, "USD");
        assert_eq!(settings.tax_rate, 10.0);
        assert_eq!(settings.shipping_flat_rate, 0.0);
        assert_eq!(settings.free_shipping_threshold, 50.0);
    }

    #[test]
    fn test_store_settings_keep_unknown_keys() {
        let settings = tenant(
            Some(serde_json::json!({"currency": "EUR", "theme": "dark"})),
            10,
        )
        .store_settings();

        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.tax_rate, 10.0);
        assert_eq!(settings.extra.get("theme"), Some(&serde_json::json!("dark")));
    }

    #[test]
    fn test_product_limit() {
        assert!(tenant(None, 10).allows_more_products(9));
        assert!(!tenant(None, 10).allows_more_products(10));
        assert!(tenant(None, -1).allows_more_products(1_000_000));
    }
}
