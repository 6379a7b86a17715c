//! # Orders API Handlers
//!
//! Checkout, order history and fulfilment. Customers only ever see their own
//! orders; store staff see every order of their store.

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{TenantHeader, TenantScope};
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::formatting::format_price;
use crate::handlers::types::{ApiResponse, PaginatedResponse, Pagination, page_params};
use crate::models::{OrderStatus, PaymentStatus, Role, order, order_item};
use crate::repositories::{
    OrderRepository,
    order::{CheckoutInput, OrderFilter, OrderSort, OrderUpdate, OrderWithItems},
    product::SortOrder,
};
use crate::server::AppState;
use crate::telemetry::counters;

const DEFAULT_ORDER_PAGE_SIZE: u64 = 20;
const MAX_ORDER_PAGE_SIZE: u64 = 100;

/// Order header without lines, as shown in listings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(example = "ORD-LX2K3J-AB12C")]
    pub order_number: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: f64,
    #[schema(example = "$37.99")]
    pub formatted_total: String,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    pub fn from_model(order: order::Model, currency: &str) -> Self {
        Self {
            formatted_total: format_price(order.total, currency),
            id: order.id,
            order_number: order.order_number,
            customer_email: order.customer_email,
            status: order.status,
            payment_status: order.payment_status,
            total: order.total,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    #[schema(value_type = Option<String>)]
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub total: f64,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(item: order_item::Model) -> Self {
        Self {
            product_id: item.product_id,
            product_name: item.product_name,
            sku: item.sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub order_number: String,
    #[schema(value_type = Option<String>)]
    pub user_id: Option<Uuid>,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub shipping_amount: f64,
    pub discount_amount: f64,
    pub total: f64,
    pub formatted_total: String,
    pub currency: String,
    #[schema(value_type = Object)]
    pub shipping_address: Value,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    pub payment_method: Option<String>,
    pub shipping_method: Option<String>,
    pub tracking_number: Option<String>,
    pub customer_notes: Option<String>,
    /// Only present for store staff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderResponse {
    fn new(order: order::Model, items: Vec<order_item::Model>, currency: &str, staff: bool) -> Self {
        Self {
            formatted_total: format_price(order.total, currency),
            currency: currency.to_string(),
            id: order.id,
            order_number: order.order_number,
            user_id: order.user_id,
            customer_email: order.customer_email,
            status: order.status,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            shipping_amount: order.shipping_amount,
            discount_amount: order.discount_amount,
            total: order.total,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method: order.payment_method,
            shipping_method: order.shipping_method,
            tracking_number: order.tracking_number,
            customer_notes: order.customer_notes,
            admin_notes: order.admin_notes.filter(|_| staff),
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListOrdersQuery {
    #[param(value_type = Option<String>, example = "PENDING")]
    pub status: Option<OrderStatus>,
    #[param(value_type = Option<String>, example = "PAID")]
    pub payment_status: Option<PaymentStatus>,
    /// Staff only
    pub customer_email: Option<String>,
    pub order_number: Option<String>,
    /// RFC 3339 timestamp, inclusive
    #[param(value_type = Option<String>)]
    pub date_from: Option<DateTime<Utc>>,
    /// RFC 3339 timestamp, inclusive
    #[param(value_type = Option<String>)]
    pub date_to: Option<DateTime<Utc>>,
    #[param(value_type = Option<String>, example = "created_at")]
    pub sort_by: Option<OrderSort>,
    #[param(value_type = Option<String>, example = "desc")]
    pub sort_order: Option<SortOrder>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Defaults to the session's e-mail
    pub customer_email: Option<String>,
    #[schema(value_type = Object)]
    pub shipping_address: Value,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    pub payment_method: Option<String>,
    pub shipping_method: Option<String>,
    #[serde(alias = "notes")]
    pub customer_notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub shipping_method: Option<String>,
    pub admin_notes: Option<String>,
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/orders",
    security(("bearer_auth" = [])),
    params(TenantHeader, ListOrdersQuery),
    responses(
        (status = 200, description = "Page of orders, newest first by default", body = PaginatedResponse<OrderSummary>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    scope: TenantScope,
    query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<OrderSummary>>, ApiError> {
    let claims = scope.require_user()?;
    let Query(query) = query?;
    let (page, limit) = page_params(
        query.page,
        query.limit,
        DEFAULT_ORDER_PAGE_SIZE,
        MAX_ORDER_PAGE_SIZE,
    )?;

    if let (Some(from), Some(to)) = (query.date_from, query.date_to)
        && from > to
    {
        return Err(validation_error(
            "date_from must not be after date_to",
            serde_json::json!({ "date_from": "Must be before date_to" }),
        ));
    }

    let staff = scope.is_staff();
    let filter = OrderFilter {
        user_id: (!staff).then(|| claims.user_id()),
        status: query.status,
        payment_status: query.payment_status,
        customer_email: query.customer_email.filter(|_| staff),
        order_number: query.order_number,
        date_from: query.date_from,
        date_to: query.date_to,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
    };

    let (orders, total) = OrderRepository::new(&state.db)
        .list(scope.tenant_id(), &filter, page, limit)
        .await?;

    let currency = scope.tenant.store_settings().currency;
    Ok(Json(PaginatedResponse::new(
        orders
            .into_iter()
            .map(|order| OrderSummary::from_model(order, &currency))
            .collect(),
        Pagination::new(page, limit, total),
    )))
}

/// Place an order from the caller's cart
#[utoipa::path(
    post,
    path = "/api/orders",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order placed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Empty cart, invalid address or not enough stock", body = ApiError),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ApiError> {
    let claims = scope.require_user()?;
    let Json(request) = payload?;

    let customer_email = request
        .customer_email
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .unwrap_or_else(|| claims.email.clone());

    let settings = scope.tenant.store_settings();
    let OrderWithItems { order, items } = OrderRepository::new(&state.db)
        .checkout(
            scope.tenant_id(),
            claims.user_id(),
            &settings,
            CheckoutInput {
                customer_email,
                shipping_address: request.shipping_address,
                billing_address: request.billing_address,
                payment_method: request.payment_method,
                shipping_method: request.shipping_method,
                customer_notes: request.customer_notes,
            },
        )
        .await?;

    counters::order_placed(&scope.tenant_id());
    if let Err(err) = state.notifier.order_placed(&order).await {
        tracing::warn!(order_id = %order.id, error = %err, "Order confirmation could not be sent");
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            OrderResponse::new(order, items, &settings.currency, scope.is_staff()),
            "Order placed successfully",
        )),
    ))
}

/// Get an order
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderResponse>),
        (status = 401, description = "No session", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let claims = scope.require_user()?;
    let staff = scope.is_staff();

    // Other customers' orders are reported as missing.
    let OrderWithItems { order, items } = OrderRepository::new(&state.db)
        .find(scope.tenant_id(), id)
        .await?
        .filter(|found| staff || found.order.user_id == Some(claims.user_id()))
        .ok_or_else(|| not_found("Order not found"))?;

    let currency = scope.tenant.store_settings().currency;
    Ok(Json(ApiResponse::ok(OrderResponse::new(
        order, items, &currency, staff,
    ))))
}

/// Update fulfilment details of an order
#[utoipa::path(
    put,
    path = "/api/orders/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Order updated", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError),
        (status = 409, description = "Order changed concurrently", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let repo = OrderRepository::new(&state.db);
    let updated = repo
        .update(
            scope.tenant_id(),
            id,
            OrderUpdate {
                status: request.status,
                payment_status: request.payment_status,
                tracking_number: request.tracking_number,
                shipping_method: request.shipping_method,
                admin_notes: request.admin_notes,
            },
        )
        .await?;
    let full = repo
        .find(scope.tenant_id(), updated.id)
        .await?
        .ok_or_else(|| not_found("Order not found"))?;

    let currency = scope.tenant.store_settings().currency;
    Ok(Json(ApiResponse::ok(OrderResponse::new(
        full.order, full.items, &currency, true,
    ))))
}

/// Cancel an order and restock its products
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Order can no longer be cancelled", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Not your order", body = ApiError),
        (status = 404, description = "Order not found", body = ApiError)
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ApiError> {
    let claims = scope.require_user()?;
    let staff = scope.is_staff();

    let repo = OrderRepository::new(&state.db);
    let existing = repo
        .find(scope.tenant_id(), id)
        .await?
        .ok_or_else(|| not_found("Order not found"))?;
    if !staff && existing.order.user_id != Some(claims.user_id()) {
        return Err(forbidden(Some("You can only cancel your own orders")));
    }

    let cancelled = repo.cancel(scope.tenant_id(), id, staff).await?;

    let currency = scope.tenant.store_settings().currency;
    Ok(Json(ApiResponse::with_message(
        OrderResponse::new(cancelled, existing.items, &currency, staff),
        "Order cancelled",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_order() -> order::Model {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        order::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            order_number: "ORD-TEST-00001".to_string(),
            customer_email: "shopper@example.com".to_string(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            subtotal: 1200.0,
            tax_amount: 120.0,
            shipping_amount: 0.0,
            discount_amount: 0.0,
            total: 1320.0,
            shipping_address: serde_json::json!({ "line1": "1 Main St" }),
            billing_address: None,
            payment_method: None,
            tracking_number: None,
            shipping_method: None,
            shipped_at: None,
            delivered_at: None,
            customer_notes: None,
            admin_notes: Some("fragile".to_string()),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_summary_formats_total_in_store_currency() {
        let summary = OrderSummary::from_model(sample_order(), "USD");
        assert_eq!(summary.formatted_total, "$1,320.00");
        assert_eq!(summary.status, OrderStatus::Pending);
    }

    #[test]
    fn test_admin_notes_hidden_from_customers() {
        let customer_view = OrderResponse::new(sample_order(), vec![], "USD", false);
        assert!(customer_view.admin_notes.is_none());

        let staff_view = OrderResponse::new(sample_order(), vec![], "USD", true);
        assert_eq!(staff_view.admin_notes.as_deref(), Some("fragile"));
    }

    #[test]
    fn test_checkout_request_accepts_notes_alias() {
        let request: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "shipping_address": { "line1": "1 Main St" },
            "notes": "leave at door"
        }))
        .unwrap();
        assert_eq!(request.customer_notes.as_deref(), Some("leave at door"));
        assert!(request.customer_email.is_none());
    }
}
