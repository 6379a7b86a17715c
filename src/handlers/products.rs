//! # Products API Handlers
//!
//! Tenant-scoped catalog browsing for shoppers and catalog management for
//! store staff.

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{TenantHeader, TenantScope};
use crate::commerce::{StockStatus, stock_status};
use crate::error::{ApiError, not_found, validation_error};
use crate::formatting::format_price;
use crate::handlers::types::{
    ApiResponse, PaginatedResponse, Pagination, double_option, page_params,
};
use crate::models::{Role, category, product};
use crate::repositories::{
    CategoryRepository, ProductRepository,
    product::{
        InventoryUpdate, NewProduct, ProductFilter, ProductSort, ProductUpdate, SortOrder,
    },
};
use crate::server::AppState;

const DEFAULT_PRODUCT_PAGE_SIZE: u64 = 12;
const MAX_PRODUCT_PAGE_SIZE: u64 = 50;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryRef {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[schema(example = 19.99)]
    pub price: f64,
    #[schema(example = "$19.99")]
    pub formatted_price: String,
    pub compare_price: Option<f64>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
    #[schema(example = "In Stock")]
    pub stock_status: String,
    pub in_stock: bool,
    pub weight: Option<f64>,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub category: Option<CategoryRef>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    pub fn new(model: product::Model, category: Option<category::Model>, currency: &str) -> Self {
        let status = if model.track_inventory {
            stock_status(model.stock, 0)
        } else {
            StockStatus::InStock
        };
        Self {
            formatted_price: format_price(model.price, currency),
            stock_status: status.label().to_string(),
            in_stock: status != StockStatus::OutOfStock,
            images: model.image_urls(),
            category: category.map(|c| CategoryRef {
                id: c.id,
                name: c.name,
                slug: c.slug,
            }),
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            price: model.price,
            compare_price: model.compare_price,
            sku: model.sku,
            barcode: model.barcode,
            stock: model.stock,
            low_stock_threshold: model.low_stock_threshold,
            track_inventory: model.track_inventory,
            weight: model.weight,
            is_active: model.is_active,
            is_featured: model.is_featured,
            meta_title: model.meta_title,
            meta_description: model.meta_description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Query parameters for product listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    /// Category ID or slug
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    #[param(value_type = Option<String>, example = "created_at")]
    pub sort_by: Option<ProductSort>,
    #[param(value_type = Option<String>, example = "desc")]
    pub sort_order: Option<SortOrder>,
    /// Staff only: include inactive products
    pub include_inactive: Option<bool>,
    /// Page number, starting at 1
    pub page: Option<u64>,
    /// Page size (default 12, max 50)
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    #[schema(example = "Wireless Headphones")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 99.99)]
    pub price: f64,
    pub compare_price: Option<f64>,
    /// Generated as `PROD-xxxx-XXXX` when omitted
    pub sku: Option<String>,
    pub barcode: Option<String>,
    #[serde(default)]
    pub stock: i32,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
    pub weight: Option<f64>,
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    #[serde(default)]
    pub images: Vec<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// Partial update; send `null` to clear an optional field
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub compare_price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub barcode: Option<Option<String>>,
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<f64>)]
    pub weight: Option<Option<f64>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub category_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub images: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub meta_description: Option<Option<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryRequest {
    /// New absolute stock level
    pub stock: Option<i32>,
    /// Signed change applied to the current level
    pub adjustment: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
}

/// List products in the store
#[utoipa::path(
    get,
    path = "/api/products",
    params(TenantHeader, ListProductsQuery),
    responses(
        (status = 200, description = "Page of products", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid filter or missing tenant", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    scope: TenantScope,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProductResponse>>, ApiError> {
    let Query(query) = query?;
    let (page, limit) = page_params(
        query.page,
        query.limit,
        DEFAULT_PRODUCT_PAGE_SIZE,
        MAX_PRODUCT_PAGE_SIZE,
    )?;
    if let (Some(min), Some(max)) = (query.price_min, query.price_max)
        && min > max
    {
        return Err(validation_error(
            "price_min cannot be greater than price_max",
            serde_json::json!({ "price_min": "Must not exceed price_max" }),
        ));
    }

    let tenant_id = scope.tenant_id();
    let category_id = match query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(reference) => {
            match CategoryRepository::new(&state.db)
                .find_by_reference(tenant_id, reference)
                .await?
            {
                Some(category) => Some(category.id),
                None => {
                    return Ok(Json(PaginatedResponse::new(
                        Vec::new(),
                        Pagination::new(page, limit, 0),
                    )));
                }
            }
        }
        None => None,
    };

    let filter = ProductFilter {
        category_id,
        price_min: query.price_min,
        price_max: query.price_max,
        in_stock: query.in_stock,
        featured: query.featured,
        search: query.search,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
        include_inactive: query.include_inactive.unwrap_or(false) && scope.is_staff(),
    };

    let (rows, total) = ProductRepository::new(&state.db)
        .list(tenant_id, &filter, page, limit)
        .await?;

    let currency = scope.tenant.store_settings().currency;
    let products = rows
        .into_iter()
        .map(|(product, category)| ProductResponse::new(product, category, &currency))
        .collect();

    Ok(Json(PaginatedResponse::new(
        products,
        Pagination::new(page, limit, total),
    )))
}

/// Get a product
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(TenantHeader, ("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product details", body = ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    let (product, category) = ProductRepository::new(&state.db)
        .find(scope.tenant_id(), id)
        .await?
        .filter(|(product, _)| product.is_active || scope.is_staff())
        .ok_or_else(|| not_found("Product not found"))?;

    let currency = scope.tenant.store_settings().currency;
    Ok(Json(ApiResponse::ok(ProductResponse::new(
        product, category, &currency,
    ))))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Staff only, or the plan's product limit is reached", body = ApiError),
        (status = 409, description = "Slug already used in this store", body = ApiError)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    let created = repo
        .create(
            &scope.tenant,
            NewProduct {
                name: request.name,
                description: request.description,
                price: request.price,
                compare_price: request.compare_price,
                sku: request.sku,
                barcode: request.barcode,
                stock: request.stock,
                low_stock_threshold: request.low_stock_threshold,
                track_inventory: request.track_inventory,
                weight: request.weight,
                category_id: request.category_id,
                is_active: request.is_active,
                is_featured: request.is_featured,
                images: request.images,
                meta_title: request.meta_title,
                meta_description: request.meta_description,
            },
        )
        .await?;

    let response = load_response(&repo, &scope, created.id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError),
        (status = 409, description = "Slug already used in this store", body = ApiError)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    repo.update(
        scope.tenant_id(),
        id,
        ProductUpdate {
            name: request.name,
            slug: request.slug,
            description: request.description,
            price: request.price,
            compare_price: request.compare_price,
            sku: request.sku,
            barcode: request.barcode,
            stock: request.stock,
            low_stock_threshold: request.low_stock_threshold,
            track_inventory: request.track_inventory,
            weight: request.weight,
            category_id: request.category_id,
            is_active: request.is_active,
            is_featured: request.is_featured,
            images: request.images,
            meta_title: request.meta_title,
            meta_description: request.meta_description,
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(load_response(&repo, &scope, id).await?)))
}

/// Adjust a product's inventory
#[utoipa::path(
    put,
    path = "/api/products/{id}/inventory",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Product UUID")),
    request_body = InventoryRequest,
    responses(
        (status = 200, description = "Inventory updated", body = ApiResponse<ProductResponse>),
        (status = 400, description = "Resulting stock would be negative", body = ApiError),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    payload: Result<Json<InventoryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ProductResponse>>, ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    repo.update_inventory(
        scope.tenant_id(),
        id,
        InventoryUpdate {
            stock: request.stock,
            adjustment: request.adjustment,
            low_stock_threshold: request.low_stock_threshold,
            track_inventory: request.track_inventory,
        },
    )
    .await?;

    Ok(Json(ApiResponse::ok(load_response(&repo, &scope, id).await?)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Tenant admin only", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    scope.require_role(Role::TenantAdmin)?;
    ProductRepository::new(&state.db)
        .delete(scope.tenant_id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load_response(
    repo: &ProductRepository<'_>,
    scope: &TenantScope,
    id: Uuid,
) -> Result<ProductResponse, ApiError> {
    let (product, category) = repo
        .find(scope.tenant_id(), id)
        .await?
        .ok_or_else(|| not_found("Product not found"))?;
    let currency = scope.tenant.store_settings().currency;
    Ok(ProductResponse::new(product, category, &currency))
}
