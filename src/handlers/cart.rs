//! # Cart API Handlers
//!
//! One cart per user and store. Every endpoint answers with the full cart so
//! clients never have to re-fetch after a change.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{TenantHeader, TenantScope};
use crate::commerce::{StockStatus, stock_status};
use crate::error::ApiError;
use crate::formatting::format_price;
use crate::handlers::types::ApiResponse;
use crate::models::tenant::StoreSettings;
use crate::repositories::{
    CartRepository,
    cart::{CartContents, CartLine},
};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItemResponse {
    #[schema(value_type = String)]
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
    pub line_total: f64,
    #[schema(example = "$39.98")]
    pub formatted_line_total: String,
    #[schema(example = "In Stock")]
    pub stock_status: String,
}

impl CartItemResponse {
    fn new(line: CartLine, currency: &str) -> Self {
        let line_total = line.line_total();
        let status = if line.product.track_inventory {
            stock_status(line.product.stock, 0)
        } else {
            StockStatus::InStock
        };
        Self {
            image: line.product.image_urls().into_iter().next(),
            product_id: line.product.id,
            name: line.product.name,
            slug: line.product.slug,
            unit_price: line.product.price,
            quantity: line.item.quantity,
            line_total,
            formatted_line_total: format_price(line_total, currency),
            stock_status: status.label().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub item_count: i64,
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
    #[schema(example = "$37.99")]
    pub formatted_total: String,
    #[schema(example = "USD")]
    pub currency: String,
}

impl CartResponse {
    pub fn new(contents: CartContents, settings: &StoreSettings) -> Self {
        let totals = contents.totals(settings);
        let item_count = contents.item_count();
        let currency = settings.currency.clone();
        Self {
            id: contents.cart.id,
            items: contents
                .lines
                .into_iter()
                .map(|line| CartItemResponse::new(line, &currency))
                .collect(),
            item_count,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            formatted_total: format_price(totals.total, &currency),
            currency,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    #[schema(value_type = String)]
    pub product_id: Uuid,
    /// Defaults to 1
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    #[schema(value_type = String)]
    pub product_id: Uuid,
    /// 0 removes the line
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveCartItemRequest {
    #[schema(value_type = String)]
    pub product_id: Uuid,
}

fn respond(scope: &TenantScope, contents: CartContents) -> Json<ApiResponse<CartResponse>> {
    Json(ApiResponse::ok(CartResponse::new(
        contents,
        &scope.tenant.store_settings(),
    )))
}

/// Get the caller's cart
#[utoipa::path(
    get,
    path = "/api/cart",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Cart with totals", body = ApiResponse<CartResponse>),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    let user_id = scope.require_user()?.user_id();
    let contents = CartRepository::new(&state.db)
        .contents(scope.tenant_id(), user_id)
        .await?;
    Ok(respond(&scope, contents))
}

/// Add a product to the cart
#[utoipa::path(
    post,
    path = "/api/cart/add",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartResponse>),
        (status = 400, description = "Invalid quantity or not enough stock", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    let user_id = scope.require_user()?.user_id();
    let Json(request) = payload?;

    let contents = CartRepository::new(&state.db)
        .add_item(
            scope.tenant_id(),
            user_id,
            request.product_id,
            request.quantity.unwrap_or(1),
        )
        .await?;
    Ok(respond(&scope, contents))
}

/// Set the quantity of a cart line
#[utoipa::path(
    put,
    path = "/api/cart/update",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartResponse>),
        (status = 400, description = "Invalid quantity or not enough stock", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 404, description = "Item not found in cart", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<UpdateCartItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    let user_id = scope.require_user()?.user_id();
    let Json(request) = payload?;

    let contents = CartRepository::new(&state.db)
        .update_item(
            scope.tenant_id(),
            user_id,
            request.product_id,
            request.quantity,
        )
        .await?;
    Ok(respond(&scope, contents))
}

/// Remove a product from the cart
#[utoipa::path(
    post,
    path = "/api/cart/remove",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = RemoveCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartResponse>),
        (status = 401, description = "No session", body = ApiError),
        (status = 404, description = "Item not found in cart", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<RemoveCartItemRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    let user_id = scope.require_user()?.user_id();
    let Json(request) = payload?;

    let contents = CartRepository::new(&state.db)
        .remove_item(scope.tenant_id(), user_id, request.product_id)
        .await?;
    Ok(respond(&scope, contents))
}

/// Empty the cart
#[utoipa::path(
    post,
    path = "/api/cart/clear",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    responses(
        (status = 200, description = "Empty cart", body = ApiResponse<CartResponse>),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    scope: TenantScope,
) -> Result<Json<ApiResponse<CartResponse>>, ApiError> {
    let user_id = scope.require_user()?.user_id();
    let repo = CartRepository::new(&state.db);
    repo.clear(scope.tenant_id(), user_id).await?;
    let contents = repo.contents(scope.tenant_id(), user_id).await?;
    Ok(respond(&scope, contents))
}
