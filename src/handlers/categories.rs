//! # Categories API Handlers

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
use crate::error::{ApiError, not_found};
use crate::handlers::types::{ApiResponse, double_option};
use crate::models::{Role, category};
use crate::repositories::{
    CategoryRepository,
    category::{CategoryUpdate, CategoryWithCount, NewCategory},
};
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Uuid>,
    #[schema(example = "Electronics")]
    pub name: String,
    #[schema(example = "electronics")]
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            parent_id: model.parent_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            image: model.image,
            is_active: model.is_active,
            product_count: None,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<CategoryWithCount> for CategoryResponse {
    fn from(value: CategoryWithCount) -> Self {
        let mut response = CategoryResponse::from(value.category);
        response.product_count = Some(value.product_count);
        response
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListCategoriesQuery {
    /// Staff only: include inactive categories
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    /// `null` detaches the category from its parent
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// List categories with product counts
#[utoipa::path(
    get,
    path = "/api/categories",
    params(TenantHeader, ListCategoriesQuery),
    responses(
        (status = 200, description = "Categories ordered by name", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 400, description = "Missing tenant", body = ApiError)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    scope: TenantScope,
    query: Result<Query<ListCategoriesQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    let Query(query) = query?;
    let include_inactive = query.include_inactive.unwrap_or(false) && scope.is_staff();

    let categories = CategoryRepository::new(&state.db)
        .list(scope.tenant_id(), include_inactive)
        .await?;

    Ok(Json(ApiResponse::ok(
        categories.into_iter().map(CategoryResponse::from).collect(),
    )))
}

/// Get a category by ID or slug
#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(TenantHeader, ("id" = String, Path, description = "Category UUID or slug")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = ApiError)
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    let category = CategoryRepository::new(&state.db)
        .find_by_reference(scope.tenant_id(), &reference)
        .await?
        .filter(|category| category.is_active || scope.is_staff())
        .ok_or_else(|| not_found("Category not found"))?;

    Ok(Json(ApiResponse::ok(CategoryResponse::from(category))))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    security(("bearer_auth" = [])),
    params(TenantHeader),
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 409, description = "Slug already used in this store", body = ApiError)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    scope: TenantScope,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let category = CategoryRepository::new(&state.db)
        .create(
            scope.tenant_id(),
            NewCategory {
                name: request.name,
                slug: request.slug,
                description: request.description,
                image: request.image,
                parent_id: request.parent_id,
                is_active: request.is_active,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CategoryResponse::from(category))),
    ))
}

/// Update a category
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Category UUID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 404, description = "Category not found", body = ApiError)
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    scope.require_role(Role::Staff)?;
    let Json(request) = payload?;

    let category = CategoryRepository::new(&state.db)
        .update(
            scope.tenant_id(),
            id,
            CategoryUpdate {
                name: request.name,
                slug: request.slug,
                description: request.description,
                image: request.image,
                parent_id: request.parent_id,
                is_active: request.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::ok(CategoryResponse::from(category))))
}

/// Delete a category; its products become uncategorised
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    security(("bearer_auth" = [])),
    params(TenantHeader, ("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Staff only", body = ApiError),
        (status = 404, description = "Category not found", body = ApiError)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    scope: TenantScope,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    scope.require_role(Role::Staff)?;
    CategoryRepository::new(&state.db)
        .delete(scope.tenant_id(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
