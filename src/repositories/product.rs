//! # Product Repository
//!
//! Catalog storage: filtered listings, CRUD with content rules, plan limits
//! and inventory adjustments.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    ModelTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
    sea_query::{Expr, Func},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::commerce::{PRODUCT_SKU_PREFIX, ProductDraft, generate_product_sku, validate_product_data};
use crate::error::RepositoryError;
use crate::formatting::generate_slug;
use crate::models::{
    Category, Product, category,
    product::{self, ActiveModel as ProductActiveModel, Model as ProductModel},
    tenant,
};
use crate::validation::{MAX_IMAGES_PER_PRODUCT, is_valid_slug};

use super::category::CategoryRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    Name,
    Price,
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    /// Featured products first, newest first within each group
    Popularity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    pub sort_by: ProductSort,
    pub sort_order: SortOrder,
    /// Staff listings also see inactive products
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub compare_price: Option<f64>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
    pub weight: Option<f64>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub images: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Partial update. Double options distinguish "leave" from "clear".
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    pub compare_price: Option<Option<f64>>,
    pub sku: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
    pub weight: Option<Option<f64>>,
    pub category_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub images: Option<Vec<String>>,
    pub meta_title: Option<Option<String>>,
    pub meta_description: Option<Option<String>>,
}

/// Stock change: either an absolute level or a signed adjustment.
#[derive(Debug, Clone, Default)]
pub struct InventoryUpdate {
    pub stock: Option<i32>,
    pub adjustment: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
}

pub type ProductWithCategory = (ProductModel, Option<category::Model>);

pub struct ProductRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProductRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductWithCategory>, u64), RepositoryError> {
        let mut query = Product::find()
            .find_also_related(Category)
            .filter(product::Column::TenantId.eq(tenant_id));

        if !filter.include_inactive {
            query = query.filter(product::Column::IsActive.eq(true));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(min) = filter.price_min {
            query = query.filter(product::Column::Price.gte(min));
        }
        if let Some(max) = filter.price_max {
            query = query.filter(product::Column::Price.lte(max));
        }
        if let Some(featured) = filter.featured {
            query = query.filter(product::Column::IsFeatured.eq(featured));
        }
        match filter.in_stock {
            Some(true) => {
                query = query.filter(
                    Condition::any()
                        .add(product::Column::TrackInventory.eq(false))
                        .add(product::Column::Stock.gt(0)),
                );
            }
            Some(false) => {
                query = query
                    .filter(product::Column::TrackInventory.eq(true))
                    .filter(product::Column::Stock.lte(0));
            }
            None => {}
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(product::Column::Name))).like(pattern.clone()))
                    .add(
                        Expr::expr(Func::lower(Expr::col(product::Column::Description)))
                            .like(pattern),
                    ),
            );
        }

        let order: Order = filter.sort_order.into();
        query = match filter.sort_by {
            ProductSort::Name => query.order_by(product::Column::Name, order),
            ProductSort::Price => query.order_by(product::Column::Price, order),
            ProductSort::CreatedAt => query.order_by(product::Column::CreatedAt, order),
            ProductSort::Popularity => query
                .order_by_desc(product::Column::IsFeatured)
                .order_by_desc(product::Column::CreatedAt),
        };

        let paginator = query.paginate(self.db, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((products, total))
    }

    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ProductWithCategory>, RepositoryError> {
        Product::find_by_id(id)
            .find_also_related(Category)
            .filter(product::Column::TenantId.eq(tenant_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn find_model(&self, tenant_id: Uuid, id: Uuid) -> Result<ProductModel, RepositoryError> {
        Product::find_by_id(id)
            .filter(product::Column::TenantId.eq(tenant_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Product not found"))
    }

    pub async fn create(
        &self,
        tenant: &tenant::Model,
        input: NewProduct,
    ) -> Result<ProductModel, RepositoryError> {
        validate_content(&ProductDraft {
            name: &input.name,
            price: input.price,
            description: input.description.as_deref(),
            sku: input.sku.as_deref(),
        })?;
        validate_stock(input.stock)?;
        validate_images(&input.images)?;

        let current = Product::find()
            .filter(product::Column::TenantId.eq(tenant.id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if !tenant.allows_more_products(current) {
            return Err(RepositoryError::forbidden(format!(
                "Product limit reached for the {} plan ({} products)",
                tenant.subscription_tier, tenant.max_products
            )));
        }

        let name = input.name.trim().to_string();
        let slug = self.checked_slug(tenant.id, &generate_slug(&name), None).await?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(tenant.id, category_id).await?;
        }

        let sku = input
            .sku
            .map(|sku| sku.trim().to_string())
            .filter(|sku| !sku.is_empty())
            .unwrap_or_else(|| generate_product_sku(PRODUCT_SKU_PREFIX));

        let now = Utc::now();
        let created = ProductActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant.id),
            category_id: Set(input.category_id),
            name: Set(name),
            slug: Set(slug),
            description: Set(input.description),
            price: Set(input.price),
            compare_price: Set(input.compare_price),
            sku: Set(Some(sku)),
            barcode: Set(input.barcode),
            stock: Set(input.stock),
            low_stock_threshold: Set(input.low_stock_threshold.unwrap_or(5)),
            track_inventory: Set(input.track_inventory.unwrap_or(true)),
            weight: Set(input.weight),
            images: Set(serde_json::json!(input.images)),
            is_active: Set(input.is_active.unwrap_or(true)),
            is_featured: Set(input.is_featured.unwrap_or(false)),
            meta_title: Set(input.meta_title),
            meta_description: Set(input.meta_description),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)?;

        tracing::info!(tenant_id = %tenant.id, product_id = %created.id, "Product created");
        Ok(created)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<ProductModel, RepositoryError> {
        let existing = self.find_model(tenant_id, id).await?;

        let name = update.name.clone().unwrap_or_else(|| existing.name.clone());
        let price = update.price.unwrap_or(existing.price);
        let description = match &update.description {
            Some(description) => description.clone(),
            None => existing.description.clone(),
        };
        let sku = match &update.sku {
            Some(sku) => sku.clone(),
            None => existing.sku.clone(),
        };
        validate_content(&ProductDraft {
            name: &name,
            price,
            description: description.as_deref(),
            sku: sku.as_deref(),
        })?;

        let mut active = existing.clone().into_active_model();

        if let Some(new_name) = update.name {
            active.name = Set(new_name.trim().to_string());
        }
        if let Some(slug) = update.slug {
            let slug = self.checked_slug(tenant_id, slug.trim(), Some(id)).await?;
            active.slug = Set(slug);
        }
        if update.description.is_some() {
            active.description = Set(description);
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(compare_price) = update.compare_price {
            active.compare_price = Set(compare_price);
        }
        if update.sku.is_some() {
            active.sku = Set(sku);
        }
        if let Some(barcode) = update.barcode {
            active.barcode = Set(barcode);
        }
        if let Some(stock) = update.stock {
            validate_stock(stock)?;
            active.stock = Set(stock);
        }
        if let Some(threshold) = update.low_stock_threshold {
            active.low_stock_threshold = Set(threshold.max(0));
        }
        if let Some(track) = update.track_inventory {
            active.track_inventory = Set(track);
        }
        if let Some(weight) = update.weight {
            active.weight = Set(weight);
        }
        if let Some(category_id) = update.category_id {
            if let Some(category_id) = category_id {
                self.ensure_category(tenant_id, category_id).await?;
            }
            active.category_id = Set(category_id);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_featured) = update.is_featured {
            active.is_featured = Set(is_featured);
        }
        if let Some(images) = update.images {
            validate_images(&images)?;
            active.images = Set(serde_json::json!(images));
        }
        if let Some(meta_title) = update.meta_title {
            active.meta_title = Set(meta_title);
        }
        if let Some(meta_description) = update.meta_description {
            active.meta_description = Set(meta_description);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_inventory(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: InventoryUpdate,
    ) -> Result<ProductModel, RepositoryError> {
        let existing = self.find_model(tenant_id, id).await?;

        let stock = match (update.stock, update.adjustment) {
            (Some(_), Some(_)) => {
                return Err(RepositoryError::validation_error(
                    "Provide either stock or adjustment, not both",
                ));
            }
            (Some(stock), None) => stock,
            (None, Some(adjustment)) => existing.stock.saturating_add(adjustment),
            (None, None) => existing.stock,
        };
        validate_stock(stock)?;

        let previous = existing.stock;
        let mut active = existing.into_active_model();
        active.stock = Set(stock);
        if let Some(threshold) = update.low_stock_threshold {
            active.low_stock_threshold = Set(threshold.max(0));
        }
        if let Some(track) = update.track_inventory {
            active.track_inventory = Set(track);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            tenant_id = %tenant_id,
            product_id = %id,
            previous,
            stock = updated.stock,
            "Inventory updated"
        );
        Ok(updated)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), RepositoryError> {
        let product = self.find_model(tenant_id, id).await?;
        product
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn checked_slug(
        &self,
        tenant_id: Uuid,
        slug: &str,
        current_id: Option<Uuid>,
    ) -> Result<String, RepositoryError> {
        if !is_valid_slug(slug) {
            return Err(RepositoryError::validation_error("Invalid product slug"));
        }

        let clash = Product::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::Slug.eq(slug))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        match clash {
            Some(other) if Some(other.id) != current_id => Err(RepositoryError::conflict(
                "A product with this slug already exists",
            )),
            _ => Ok(slug.to_string()),
        }
    }

    async fn ensure_category(&self, tenant_id: Uuid, category_id: Uuid) -> Result<(), RepositoryError> {
        CategoryRepository::new(self.db)
            .find(tenant_id, category_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| RepositoryError::validation_error("Category not found in this store"))
    }
}

fn validate_content(draft: &ProductDraft<'_>) -> Result<(), RepositoryError> {
    let errors = validate_product_data(draft);
    match errors.into_iter().next() {
        Some(first) => Err(RepositoryError::Validation(first)),
        None => Ok(()),
    }
}

fn validate_stock(stock: i32) -> Result<(), RepositoryError> {
    if stock < 0 {
        return Err(RepositoryError::validation_error(
            "Stock cannot be negative",
        ));
    }
    Ok(())
}

fn validate_images(images: &[String]) -> Result<(), RepositoryError> {
    if images.len() > MAX_IMAGES_PER_PRODUCT {
        return Err(RepositoryError::validation_error(format!(
            "A product can have at most {MAX_IMAGES_PER_PRODUCT} images"
        )));
    }
    Ok(())
}
