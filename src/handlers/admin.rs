//! # Platform Administration Handlers
//!
//! User management across all stores. Mounted under `/api/admin`, which only
//! super admins can reach.

use axum::{
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::service::{AuthService, CreateUserInput};
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::auth::UserProfile;
use crate::handlers::types::{ApiResponse, PaginatedResponse, Pagination, page_params};
use crate::models::Role;
use crate::repositories::{TenantRepository, UserRepository, user::UserFilter};
use crate::server::AppState;

const DEFAULT_USER_PAGE_SIZE: u64 = 25;
const MAX_USER_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    #[param(value_type = Option<String>)]
    pub tenant_id: Option<Uuid>,
    /// SUPER_ADMIN, TENANT_ADMIN, STAFF or CUSTOMER
    pub role: Option<String>,
    /// Matches e-mail or name
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    #[schema(value_type = Option<String>)]
    pub tenant_id: Option<Uuid>,
}

/// List users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    security(("bearer_auth" = [])),
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserProfile>),
        (status = 400, description = "Invalid filter", body = ApiError),
        (status = 401, description = "No session", body = ApiError),
        (status = 403, description = "Super admin only", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<UserProfile>>, ApiError> {
    let Query(query) = query?;
    let (page, limit) = page_params(
        query.page,
        query.limit,
        DEFAULT_USER_PAGE_SIZE,
        MAX_USER_PAGE_SIZE,
    )?;

    let role = match query.role.as_deref() {
        Some(raw) => Some(Role::parse(raw).ok_or_else(|| {
            validation_error(
                "Invalid role",
                serde_json::json!({ "role": "Expected SUPER_ADMIN, TENANT_ADMIN, STAFF or CUSTOMER" }),
            )
        })?),
        None => None,
    };

    let filter = UserFilter {
        tenant_id: query.tenant_id,
        role,
        search: query.search,
    };
    let (users, total) = UserRepository::new(&state.db)
        .list(&filter, page, limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserProfile::from).collect(),
        Pagination::new(page, limit, total),
    )))
}

/// Create a user with any role
#[utoipa::path(
    post,
    path = "/api/admin/users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Super admin only", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    let Json(request) = payload?;
    let role = request.role.unwrap_or_default();

    if matches!(role, Role::TenantAdmin | Role::Staff) && request.tenant_id.is_none() {
        return Err(validation_error(
            "Store staff must belong to a store",
            serde_json::json!({ "tenant_id": "Required for TENANT_ADMIN and STAFF" }),
        ));
    }
    if let Some(tenant_id) = request.tenant_id
        && TenantRepository::new(&state.db)
            .find_by_id(tenant_id)
            .await?
            .is_none()
    {
        return Err(not_found("Tenant not found"));
    }

    let user = AuthService::new(&state.db, &state.config)
        .create_user(CreateUserInput {
            email: request.email,
            password: request.password,
            name: request.name,
            tenant_id: request.tenant_id,
            role: Some(role),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = role.as_str(), "User created by administrator");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(UserProfile::from(user))),
    ))
}
