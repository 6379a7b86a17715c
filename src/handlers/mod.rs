//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the storefront API.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod tenants;
pub mod types;

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::ServiceInfo;
use crate::server::AppState;

/// Health probe body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthStatus {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Process is up", body = HealthStatus)
    ),
    tag = "root"
)]
pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus::new("ok"))
}

/// Readiness probe; checks the database
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Database reachable", body = HealthStatus),
        (status = 503, description = "Database unavailable", body = HealthStatus)
    ),
    tag = "root"
)]
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    match crate::db::health_check(&state.db).await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus::new("ready"))),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus::new("unavailable")),
            )
        }
    }
}
