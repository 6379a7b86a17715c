//! # Authentication and Authorization
//!
//! Session extraction, role guards and tenant scoping for the storefront API.
//!
//! Handlers take [`AuthUser`] when a session is mandatory, [`MaybeAuthUser`]
//! when it is optional and [`TenantScope`] for anything that reads or writes
//! tenant-owned data.

pub mod password;
pub mod roles;
pub mod service;
pub mod session;

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;

pub use roles::{can_access_tenant, has_role, is_staff};
pub use session::{SessionClaims, SessionError, SessionKeys};

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, not_found, unauthorized, validation_error};
use crate::models::{Role, tenant};
use crate::repositories::TenantRepository;
use crate::server::AppState;

pub const TENANT_HEADER: &str = "x-tenant-id";

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}

/// A request carrying a valid session.
#[derive(Debug, Clone)]
pub struct AuthUser(pub SessionClaims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.0.tenant_id
    }

    pub fn require_role(&self, required: Role) -> Result<(), ApiError> {
        if has_role(self.0.role, required) {
            Ok(())
        } else {
            Err(forbidden(Some("Insufficient permissions")))
        }
    }

    pub fn require_tenant_access(&self, tenant_id: Uuid) -> Result<(), ApiError> {
        if can_access_tenant(self.0.tenant_id, tenant_id, self.0.role) {
            Ok(())
        } else {
            Err(forbidden(Some("Access denied to this tenant")))
        }
    }
}

/// A request that may or may not carry a session. Invalid tokens count as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<SessionClaims>);

fn session_from_headers(
    keys: &SessionKeys,
    headers: &HeaderMap,
) -> Result<SessionClaims, ApiError> {
    let token = session::token_from_headers(headers).ok_or_else(|| unauthorized(None))?;

    keys.decode(&token).map_err(|err| {
        tracing::debug!(error = %err, "Rejected session token");
        match err {
            SessionError::Expired => unauthorized(Some("Session expired")),
            _ => unauthorized(Some("Invalid session")),
        }
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthUser>() {
            return Ok(cached.clone());
        }

        let keys = SessionKeys::from_ref(state);
        let user = AuthUser(session_from_headers(&keys, &parts.headers)?);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    SessionKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<AuthUser>() {
            return Ok(MaybeAuthUser(Some(cached.0.clone())));
        }

        let keys = SessionKeys::from_ref(state);
        Ok(MaybeAuthUser(
            session_from_headers(&keys, &parts.headers).ok(),
        ))
    }
}

/// Route guard for `/api/admin/*`.
pub async fn require_super_admin(
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if user.role() != Role::SuperAdmin {
        tracing::warn!(user_id = %user.id(), role = user.role().as_str(), "Admin route denied");
        return Err(forbidden(None));
    }
    Ok(next.run(request).await)
}

/// Route guard for `/api/dashboard/*`.
pub async fn require_tenant_admin(
    user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !matches!(user.role(), Role::TenantAdmin | Role::SuperAdmin) {
        tracing::warn!(user_id = %user.id(), role = user.role().as_str(), "Dashboard route denied");
        return Err(forbidden(None));
    }
    Ok(next.run(request).await)
}

/// The tenant a request operates on, plus the caller's session if any.
#[derive(Debug, Clone)]
pub struct TenantScope {
    pub tenant: tenant::Model,
    pub session: Option<SessionClaims>,
}

impl TenantScope {
    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    /// Staff-or-higher role that is allowed to manage this tenant.
    pub fn is_staff(&self) -> bool {
        self.has_tenant_role(Role::Staff)
    }

    pub fn has_tenant_role(&self, required: Role) -> bool {
        self.session.as_ref().is_some_and(|claims| {
            has_role(claims.role, required)
                && can_access_tenant(claims.tenant_id, self.tenant.id, claims.role)
        })
    }

    pub fn require_user(&self) -> Result<&SessionClaims, ApiError> {
        self.session.as_ref().ok_or_else(|| unauthorized(None))
    }

    /// Requires a session holding `required` (or higher) for this tenant.
    pub fn require_role(&self, required: Role) -> Result<&SessionClaims, ApiError> {
        let claims = self.require_user()?;
        if self.has_tenant_role(required) {
            Ok(claims)
        } else {
            Err(forbidden(Some("Insufficient permissions")))
        }
    }
}

/// Picks the tenant for a request from the session and the `X-Tenant-Id` header.
///
/// Tenant-bound users are pinned to their own tenant; super admins, tenant-less
/// users and anonymous visitors must name one.
pub fn resolve_tenant_id(
    session: Option<&SessionClaims>,
    header: Option<Uuid>,
) -> Result<Uuid, ApiError> {
    if let Some(claims) = session
        && claims.role != Role::SuperAdmin
        && let Some(own) = claims.tenant_id
    {
        return match header {
            Some(requested) if requested != own => {
                Err(forbidden(Some("Access denied to this tenant")))
            }
            _ => Ok(own),
        };
    }

    header.ok_or_else(|| {
        validation_error(
            "Tenant context required",
            serde_json::json!({ "X-Tenant-Id": "Required header is missing" }),
        )
    })
}

fn tenant_header(headers: &HeaderMap) -> Result<Option<Uuid>, ApiError> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(None);
    };

    let raw = value.to_str().map_err(|_| {
        validation_error(
            "Invalid tenant header",
            serde_json::json!({ "X-Tenant-Id": "Header must be valid UTF-8" }),
        )
    })?;

    if raw.trim().is_empty() {
        return Ok(None);
    }

    raw.trim().parse::<Uuid>().map(Some).map_err(|_| {
        validation_error(
            "Invalid tenant ID",
            serde_json::json!({ "X-Tenant-Id": "Must be a valid UUID" }),
        )
    })
}

impl<S> FromRequestParts<S> for TenantScope
where
    SessionKeys: FromRef<S>,
    DatabaseConnection: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<TenantScope>() {
            return Ok(cached.clone());
        }

        let MaybeAuthUser(session) = MaybeAuthUser::from_request_parts(parts, state).await?;
        let header = tenant_header(&parts.headers)?;
        let tenant_id = resolve_tenant_id(session.as_ref(), header)?;

        let db = DatabaseConnection::from_ref(state);
        let tenant = TenantRepository::new(&db)
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| not_found("Tenant not found"))?;

        let scope = TenantScope { tenant, session };
        parts.extensions.insert(scope.clone());
        Ok(scope)
    }
}

/// OpenAPI header parameter for X-Tenant-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct TenantHeader {
    /// Store (tenant) identifier; optional for users bound to a tenant
    #[serde(rename = "X-Tenant-Id")]
    #[param(rename = "X-Tenant-Id", value_type = Option<String>)]
    pub tenant_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::AUTHORIZATION},
        routing::get,
    };
    use chrono::Utc;
    use tower::ServiceExt;

    fn claims(role: Role, tenant_id: Option<Uuid>) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: None,
            image: None,
            role,
            tenant_id,
            iat: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn test_tenant_bound_user_is_pinned() {
        let own = Uuid::new_v4();
        let session = claims(Role::Staff, Some(own));

        assert_eq!(resolve_tenant_id(Some(&session), None).unwrap(), own);
        assert_eq!(resolve_tenant_id(Some(&session), Some(own)).unwrap(), own);

        let err = resolve_tenant_id(Some(&session), Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_super_admin_and_visitors_use_header() {
        let target = Uuid::new_v4();
        let admin = claims(Role::SuperAdmin, Some(Uuid::new_v4()));

        assert_eq!(resolve_tenant_id(Some(&admin), Some(target)).unwrap(), target);
        assert_eq!(resolve_tenant_id(None, Some(target)).unwrap(), target);

        let err = resolve_tenant_id(None, None).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_tenant_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(tenant_header(&headers).unwrap(), None);

        headers.insert(TENANT_HEADER, "not-a-uuid".parse().unwrap());
        assert!(tenant_header(&headers).is_err());

        let id = Uuid::new_v4();
        headers.insert(TENANT_HEADER, id.to_string().parse().unwrap());
        assert_eq!(tenant_header(&headers).unwrap(), Some(id));
    }

    async fn guarded_status(role: Option<Role>) -> StatusCode {
        async fn handler() -> &'static str {
            "OK"
        }

        let keys = SessionKeys::from_config(&AppConfig::default());
        let app = Router::new()
            .route("/admin", get(handler))
            .layer(axum::middleware::from_fn_with_state(
                keys.clone(),
                require_super_admin,
            ))
            .with_state(keys.clone());

        let mut request = Request::builder().uri("/admin");
        if let Some(role) = role {
            let now = Utc::now();
            let user = crate::models::user::Model {
                id: Uuid::new_v4(),
                email: "guard@example.com".to_string(),
                name: None,
                password_hash: None,
                image: None,
                role,
                tenant_id: None,
                email_verified_at: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            let token = keys.issue(&user).unwrap().token;
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_admin_guard() {
        assert_eq!(guarded_status(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            guarded_status(Some(Role::TenantAdmin)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(guarded_status(Some(Role::SuperAdmin)).await, StatusCode::OK);
    }

    #[test]
    fn test_scope_roles_respect_tenant() {
        let now = Utc::now();
        let tenant = tenant::Model {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            domain: None,
            description: None,
            logo: None,
            settings: None,
            subscription_tier: "free".to_string(),
            subscription_status: "active".to_string(),
            max_products: 10,
            max_customers: 100,
            max_storage_mb: 100,
            created_at: now,
            updated_at: now,
        };

        let staff = TenantScope {
            tenant: tenant.clone(),
            session: Some(claims(Role::Staff, Some(tenant.id))),
        };
        assert!(staff.is_staff());
        assert!(staff.require_role(Role::TenantAdmin).is_err());

        let foreign_admin = TenantScope {
            tenant: tenant.clone(),
            session: Some(claims(Role::TenantAdmin, Some(Uuid::new_v4()))),
        };
        assert!(!foreign_admin.is_staff());

        let anonymous = TenantScope {
            tenant,
            session: None,
        };
        assert_eq!(
            anonymous.require_user().unwrap_err().status,
            StatusCode::UNAUTHORIZED
        );
    }
}
