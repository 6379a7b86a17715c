//! # Dashboard API Handlers
//!
//! Store-operator overview. Mounted under `/api/dashboard`, which is guarded
//! for tenant admins and super admins.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};
use chrono::{Duration, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::analytics::{SalesSummary, summarize_sales};
use crate::auth::{TenantHeader, TenantScope};
use crate::commerce::stock_status;
use crate::error::{ApiError, RepositoryError, validation_error};
use crate::handlers::orders::OrderSummary;
use crate::handlers::types::ApiResponse;
use crate::models::{Role, tenant};
use crate::repositories::{
    CartRepository, OrderRepository, TenantRepository, UserRepository,
};
use crate::server::AppState;

const RECENT_ORDER_COUNT: u64 = 5;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// Length of the reporting window in days (default 30, max 365)
    pub period_days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LowStockProduct {
    #[schema(value_type = String)]
    pub id: uuid::Uuid,
    pub name: String,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub stock_status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub store_name: String,
    pub period_days: i64,
    pub sales: SalesSummary,
    pub product_count: u64,
    pub customer_count: u64,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<OrderSummary>,
}

/// Sales figures for the last `days` days compared with the `days` before.
pub async fn sales_summary(
    db: &DatabaseConnection,
    tenant: &tenant::Model,
    days: i64,
) -> Result<SalesSummary, RepositoryError> {
    let now = Utc::now();
    let period = Duration::days(days);
    let current_start = now - period;
    let previous_start = current_start - period;

    let orders = OrderRepository::new(db);
    let current = orders.facts_between(tenant.id, current_start, now).await?;
    let previous = orders
        .facts_between(tenant.id, previous_start, current_start)
        .await?;
    let open_carts = CartRepository::new(db).count_open_carts(tenant.id).await?;

    let currency = tenant.store_settings().currency;
    Ok(summarize_sales(&current, &previous, open_carts, &currency))
}

/// Overview for the store dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    security(("bearer_auth" = [])),
    params(TenantHeader, SummaryQuery),
    responses(
        (status = 200, description = "Dashboard overview", body = ApiResponse<DashboardSummary>),
        (status = 400, description = "Tenant context missing or invalid period", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Tenant admin or super admin only", body = ApiError)
    ),
    tag = "dashboard"
)]
pub async fn summary(
    State(state): State<AppState>,
    scope: TenantScope,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let Query(query) = query?;
    scope.require_role(Role::TenantAdmin)?;

    let days = query.period_days.unwrap_or(30);
    if !(1..=365).contains(&days) {
        return Err(validation_error(
            "period_days must be between 1 and 365",
            serde_json::json!({ "period_days": "Must be between 1 and 365" }),
        ));
    }

    let tenant = &scope.tenant;
    let sales = sales_summary(&state.db, tenant, days).await?;
    let product_count = TenantRepository::new(&state.db)
        .count_products(tenant.id)
        .await?;
    let customer_count = UserRepository::new(&state.db)
        .count_customers(tenant.id)
        .await?;

    let orders = OrderRepository::new(&state.db);
    let low_stock = orders
        .low_stock_products(tenant.id)
        .await?
        .into_iter()
        .map(|product| LowStockProduct {
            id: product.id,
            stock_status: stock_status(product.stock, 0).label().to_string(),
            name: product.name,
            stock: product.stock,
            low_stock_threshold: product.low_stock_threshold,
        })
        .collect();
    let currency = tenant.store_settings().currency;
    let recent_orders = orders
        .recent(tenant.id, RECENT_ORDER_COUNT)
        .await?
        .into_iter()
        .map(|order| OrderSummary::from_model(order, &currency))
        .collect();

    Ok(Json(ApiResponse::ok(DashboardSummary {
        store_name: tenant
            .store_settings()
            .store_name
            .unwrap_or_else(|| tenant.name.clone()),
        period_days: days,
        sales,
        product_count,
        customer_count,
        low_stock,
        recent_orders,
    })))
}
