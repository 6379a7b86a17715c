//! # Tenants API Handlers
//!
//! This module contains handlers for store (tenant) listing, creation and
//! management, including the store settings document and sales analytics.

use axum::{
    extract::{Path, Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::analytics::SalesSummary;
use crate::auth::AuthUser;
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::dashboard::sales_summary;
use crate::handlers::types::ApiResponse;
use crate::models::{Role, tenant::{self, StoreSettings}};
use crate::repositories::{
    TenantRepository,
    tenant::{CreateTenantRequest, UpdateTenantRequest},
};
use crate::server::AppState;

const DEFAULT_ANALYTICS_DAYS: i64 = 30;
const MAX_ANALYTICS_DAYS: i64 = 365;

/// Entry in the public store directory
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantSummary {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(example = "Acme Store")]
    pub name: String,
    #[schema(example = "acme-store")]
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanLimits {
    /// -1 means unlimited
    pub max_products: i32,
    pub max_customers: i32,
    pub max_storage_mb: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TenantResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    #[schema(example = "free")]
    pub subscription_tier: String,
    #[schema(example = "active")]
    pub subscription_status: String,
    pub limits: PlanLimits,
    pub settings: StoreSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tenant::Model> for TenantResponse {
    fn from(model: tenant::Model) -> Self {
        let settings = model.store_settings();
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            domain: model.domain,
            description: model.description,
            logo: model.logo,
            subscription_tier: model.subscription_tier,
            subscription_status: model.subscription_status,
            limits: PlanLimits {
                max_products: model.max_products,
                max_customers: model.max_customers,
                max_storage_mb: model.max_storage_mb,
            },
            settings,
            product_count: None,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request payload for creating a new tenant
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTenantRequestDto {
    /// Display name for the store (required, max 255 characters)
    #[schema(example = "Acme Store")]
    pub name: String,
    /// URL handle; derived from the name when omitted
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    /// free, starter or professional
    #[schema(example = "free")]
    pub plan: Option<String>,
    pub settings: Option<StoreSettings>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTenantRequestDto {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    /// Super admin only
    pub plan: Option<String>,
    /// Super admin only
    pub subscription_status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// Length of the reporting window in days (default 30, max 365)
    pub period_days: Option<i64>,
}

/// List active stores
#[utoipa::path(
    get,
    path = "/api/tenants",
    responses(
        (status = 200, description = "Active stores ordered by name", body = ApiResponse<Vec<TenantSummary>>),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TenantSummary>>>, ApiError> {
    let tenants = TenantRepository::new(&state.db).list_active().await?;

    Ok(Json(ApiResponse::ok(
        tenants
            .into_iter()
            .map(|t| TenantSummary {
                id: t.id,
                name: t.name,
                slug: t.slug,
            })
            .collect(),
    )))
}

/// Create a new store
#[utoipa::path(
    post,
    path = "/api/tenants",
    security(("bearer_auth" = [])),
    request_body = CreateTenantRequestDto,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<TenantResponse>, headers(
            ("Location", description = "URL of the created store")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Super admin only", body = ApiError),
        (status = 409, description = "Slug already taken", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTenantRequestDto>, JsonRejection>,
) -> Result<
    (
        StatusCode,
        [(&'static str, String); 1],
        Json<ApiResponse<TenantResponse>>,
    ),
    ApiError,
> {
    user.require_role(Role::SuperAdmin)?;
    let Json(request) = payload?;

    let tenant = TenantRepository::new(&state.db)
        .create_tenant(CreateTenantRequest {
            name: request.name,
            slug: request.slug,
            domain: request.domain,
            description: request.description,
            logo: request.logo,
            plan: request.plan,
            settings: request.settings,
        })
        .await?;

    let location = format!("/api/tenants/{}", tenant.id);
    Ok((
        StatusCode::CREATED,
        [("Location", location)],
        Json(ApiResponse::ok(TenantResponse::from(tenant))),
    ))
}

/// Get a store
#[utoipa::path(
    get,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 200, description = "Store details", body = ApiResponse<TenantResponse>),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Not a member of this store", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<TenantResponse>>, ApiError> {
    user.require_tenant_access(tenant_id)?;

    let repo = TenantRepository::new(&state.db);
    let tenant = repo
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;
    let product_count = repo.count_products(tenant_id).await?;

    let mut response = TenantResponse::from(tenant);
    response.product_count = Some(product_count);
    Ok(Json(ApiResponse::ok(response)))
}

/// Update a store
#[utoipa::path(
    put,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID")),
    request_body = UpdateTenantRequestDto,
    responses(
        (status = 200, description = "Store updated", body = ApiResponse<TenantResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
    payload: Result<Json<UpdateTenantRequestDto>, JsonRejection>,
) -> Result<Json<ApiResponse<TenantResponse>>, ApiError> {
    require_store_admin(&user, tenant_id)?;
    let Json(request) = payload?;

    if (request.plan.is_some() || request.subscription_status.is_some())
        && user.role() != Role::SuperAdmin
    {
        return Err(forbidden(Some(
            "Only platform administrators can change the subscription",
        )));
    }

    let tenant = TenantRepository::new(&state.db)
        .update_tenant(
            tenant_id,
            UpdateTenantRequest {
                name: request.name,
                domain: request.domain,
                description: request.description,
                logo: request.logo,
                plan: request.plan,
                subscription_status: request.subscription_status,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(TenantResponse::from(tenant))))
}

/// Delete a store and everything it owns
#[utoipa::path(
    delete,
    path = "/api/tenants/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 204, description = "Store deleted"),
        (status = 403, description = "Super admin only", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn delete_tenant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require_role(Role::SuperAdmin)?;
    TenantRepository::new(&state.db)
        .delete_tenant(tenant_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Read the store settings
#[utoipa::path(
    get,
    path = "/api/tenants/{id}/settings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID")),
    responses(
        (status = 200, description = "Store settings", body = ApiResponse<StoreSettings>),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StoreSettings>>, ApiError> {
    require_store_admin(&user, tenant_id)?;

    let tenant = TenantRepository::new(&state.db)
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;

    Ok(Json(ApiResponse::ok(tenant.store_settings())))
}

/// Replace the store settings
#[utoipa::path(
    put,
    path = "/api/tenants/{id}/settings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID")),
    request_body = StoreSettings,
    responses(
        (status = 200, description = "Settings saved", body = ApiResponse<StoreSettings>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
    payload: Result<Json<StoreSettings>, JsonRejection>,
) -> Result<Json<ApiResponse<StoreSettings>>, ApiError> {
    require_store_admin(&user, tenant_id)?;
    let Json(settings) = payload?;
    validate_settings(&settings)?;

    let tenant = TenantRepository::new(&state.db)
        .update_settings(tenant_id, &settings)
        .await?;

    Ok(Json(ApiResponse::with_message(
        tenant.store_settings(),
        "Settings saved",
    )))
}

/// Sales analytics for the store
#[utoipa::path(
    get,
    path = "/api/tenants/{id}/analytics",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Store UUID"), AnalyticsQuery),
    responses(
        (status = 200, description = "Sales summary for the period", body = ApiResponse<SalesSummary>),
        (status = 400, description = "Invalid period", body = ApiError),
        (status = 403, description = "Insufficient permissions", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn tenant_analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Path(tenant_id): Path<Uuid>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SalesSummary>>, ApiError> {
    let Query(query) = query?;
    require_store_admin(&user, tenant_id)?;

    let days = query.period_days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    if !(1..=MAX_ANALYTICS_DAYS).contains(&days) {
        return Err(validation_error(
            "period_days must be between 1 and 365",
            serde_json::json!({ "period_days": "Must be between 1 and 365" }),
        ));
    }

    let tenant = TenantRepository::new(&state.db)
        .find_by_id(tenant_id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;

    let summary = sales_summary(&state.db, &tenant, days).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

fn require_store_admin(user: &AuthUser, tenant_id: Uuid) -> Result<(), ApiError> {
    user.require_role(Role::TenantAdmin)?;
    user.require_tenant_access(tenant_id)
}

fn validate_settings(settings: &StoreSettings) -> Result<(), ApiError> {
    if crate::formatting::currency(&settings.currency).is_none() {
        return Err(validation_error(
            "Unsupported currency",
            serde_json::json!({ "currency": "Expected one of USD, EUR, GBP, CAD, AUD, JPY" }),
        ));
    }
    if !(0.0..=100.0).contains(&settings.tax_rate) {
        return Err(validation_error(
            "Tax rate must be between 0 and 100",
            serde_json::json!({ "tax_rate": "Percent between 0 and 100" }),
        ));
    }
    if settings.shipping_flat_rate < 0.0 || settings.free_shipping_threshold < 0.0 {
        return Err(validation_error(
            "Shipping amounts cannot be negative",
            serde_json::json!({ "shipping": "Must be zero or greater" }),
        ));
    }
    if let Some(email) = settings.contact_email.as_deref()
        && !crate::validation::is_valid_email(email)
    {
        return Err(validation_error(
            "Invalid contact email",
            serde_json::json!({ "contact_email": "Must be a valid email address" }),
        ));
    }
    Ok(())
}
