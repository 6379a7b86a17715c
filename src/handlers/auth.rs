//! # Authentication API Handlers
//!
//! Registration, login/logout, the current session, password changes and the
//! two-step password reset flow.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::Json,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AuthUser, SessionClaims, service::{AuthService, CreateUserInput}};
use crate::error::{ApiError, forbidden, not_found, unauthorized, validation_error};
use crate::handlers::types::ApiResponse;
use crate::models::{Role, user};
use crate::repositories::{TenantRepository, UserRepository};
use crate::server::AppState;
use crate::telemetry::counters;
use crate::validation::is_valid_email;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(example = "shopper@example.com")]
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    #[schema(value_type = Option<String>)]
    pub tenant_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            image: model.image,
            role: model.role,
            tenant_id: model.tenant_id,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "shopper@example.com")]
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    /// Store the account belongs to; omit for a global shopper account
    #[schema(value_type = Option<String>)]
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Restricts the login to accounts of this store
    pub tenant_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserProfile,
    /// Bearer token; the same value is set in the session cookie
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub user: SessionClaims,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    /// `request` issues a token, `reset` redeems one
    #[schema(example = "request")]
    pub action: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    #[serde(alias = "newPassword")]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordResponse {
    pub message: String,
    /// Only returned when the deployment exposes reset tokens (local/test)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Register a customer account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Store customer limit reached", body = ApiError),
        (status = 404, description = "Store not found", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    let Json(request) = payload?;

    if let Some(tenant_id) = request.tenant_id {
        let tenant = TenantRepository::new(&state.db)
            .find_by_id(tenant_id)
            .await?
            .filter(|tenant| tenant.is_active())
            .ok_or_else(|| not_found("Tenant not found"))?;

        if tenant.max_customers >= 0 {
            let customers = UserRepository::new(&state.db)
                .count_customers(tenant_id)
                .await?;
            if customers >= tenant.max_customers as u64 {
                return Err(forbidden(Some("This store cannot accept new customers")));
            }
        }
    }

    let user = AuthService::new(&state.db, &state.config)
        .create_user(CreateUserInput {
            email: request.email,
            password: request.password,
            name: request.name,
            tenant_id: request.tenant_id,
            role: Some(Role::Customer),
        })
        .await?;

    counters::user_registered();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            UserProfile::from(user),
            "Account created successfully",
        )),
    ))
}

/// Sign in with e-mail and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; the session cookie is set", body = ApiResponse<LoginResponse>, headers(
            ("Set-Cookie", description = "HttpOnly session cookie")
        )),
        (status = 400, description = "Malformed request", body = ApiError),
        (status = 401, description = "Invalid email or password", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<ApiResponse<LoginResponse>>), ApiError> {
    let Json(request) = payload?;

    let user = AuthService::new(&state.db, &state.config)
        .authenticate(&request.email, &request.password, request.tenant_id.as_deref())
        .await?;

    let Some(user) = user else {
        counters::login_failed();
        return Err(unauthorized(Some(INVALID_CREDENTIALS)));
    };

    let issued = state.sessions.issue(&user).map_err(|err| {
        tracing::error!(error = %err, user_id = %user.id, "Failed to issue session");
        crate::error::internal_error()
    })?;

    let mut headers = HeaderMap::new();
    if let Some(cookie) = state.sessions.session_cookie(&issued.token) {
        headers.insert(SET_COOKIE, cookie);
    }

    counters::login_succeeded();
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User signed in");

    Ok((
        headers,
        Json(ApiResponse::ok(LoginResponse {
            user: UserProfile::from(user),
            token: issued.token,
            expires_at: timestamp(issued.claims.exp),
        })),
    ))
}

/// Sign out and clear the session cookie
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Signed out", body = ApiResponse<bool>),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> (HeaderMap, Json<ApiResponse<bool>>) {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, state.sessions.clear_cookie());
    tracing::info!(user_id = %user.id(), "User signed out");

    (headers, Json(ApiResponse::with_message(true, "Signed out")))
}

/// Current session claims
#[utoipa::path(
    get,
    path = "/api/auth/session",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active session", body = ApiResponse<SessionResponse>),
        (status = 401, description = "No session or session expired", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn session(AuthUser(claims): AuthUser) -> Json<ApiResponse<SessionResponse>> {
    let expires_at = timestamp(claims.exp);
    Json(ApiResponse::ok(SessionResponse {
        user: claims,
        expires_at,
    }))
}

/// Change the signed-in user's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<bool>),
        (status = 400, description = "Wrong current password or weak new password", body = ApiError),
        (status = 401, description = "No session", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let Json(request) = payload?;

    AuthService::new(&state.db, &state.config)
        .change_password(user.id(), &request.current_password, &request.new_password)
        .await?;

    Ok(Json(ApiResponse::with_message(
        true,
        "Password changed successfully",
    )))
}

/// Request a reset token (`action: "request"`) or redeem one (`action: "reset"`)
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Token issued or password reset", body = ApiResponse<ResetPasswordResponse>),
        (status = 400, description = "Invalid action, unknown user, or invalid/expired token", body = ApiError),
        (status = 404, description = "User not found", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResetPasswordResponse>>, ApiError> {
    let Json(request) = payload?;
    let service = AuthService::new(&state.db, &state.config);

    let email = request.email.unwrap_or_default();
    let email = email.trim();

    match request.action.as_deref() {
        Some("request") => {
            require_email(email)?;
            let issued = service.generate_password_reset_token(email).await?;
            counters::password_reset_requested();

            if let Err(err) = state
                .notifier
                .password_reset_requested(email, &issued.token, issued.expires_at)
                .await
            {
                tracing::warn!(error = %err, "Password reset notification failed");
            }

            let expose = state.config.expose_reset_tokens;
            Ok(Json(ApiResponse::ok(ResetPasswordResponse {
                message: "Password reset token generated".to_string(),
                token: expose.then_some(issued.token),
                expires_at: Some(issued.expires_at),
            })))
        }
        Some("reset") => {
            require_email(email)?;
            let token = request
                .token
                .filter(|token| !token.trim().is_empty())
                .ok_or_else(|| {
                    validation_error(
                        "Token is required",
                        serde_json::json!({ "token": "Required" }),
                    )
                })?;
            let new_password = request.new_password.unwrap_or_default();

            service.reset_password(email, &token, &new_password).await?;

            Ok(Json(ApiResponse::ok(ResetPasswordResponse {
                message: "Password reset successfully".to_string(),
                token: None,
                expires_at: None,
            })))
        }
        _ => Err(validation_error(
            "Invalid action",
            serde_json::json!({ "action": "Expected \"request\" or \"reset\"" }),
        )),
    }
}

fn require_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(validation_error(
            "Invalid email address",
            serde_json::json!({ "email": "Must be a valid email address" }),
        ))
    }
}

fn timestamp(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_else(Utc::now)
}
