//! Signed session tokens.
//!
//! Sessions are stateless HS256 JWTs carrying the user's role and tenant. They
//! travel either as `Authorization: Bearer <token>` or in the HttpOnly
//! `storefront_session` cookie.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{Role, user};

pub const SESSION_COOKIE_NAME: &str = "storefront_session";

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    /// User ID
    pub sub: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("session expired")]
    Expired,
    #[error("invalid session token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// A freshly signed session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    max_age_seconds: i64,
    secure_cookie: bool,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("max_age_seconds", &self.max_age_seconds)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn from_config(config: &AppConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            max_age_seconds: i64::try_from(config.session_max_age_seconds).unwrap_or(i64::MAX),
            secure_cookie: !config.is_development(),
        }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    /// Signs a session for `user`.
    pub fn issue(&self, user: &user::Model) -> Result<IssuedSession, SessionError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            iat: now,
            exp: now.saturating_add(self.max_age_seconds),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Encode)?;

        Ok(IssuedSession { token, claims })
    }

    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionError::Expired,
                _ => SessionError::Invalid(err),
            })
    }

    /// `Set-Cookie` value that stores `token` for the session lifetime.
    pub fn session_cookie(&self, token: &str) -> Option<HeaderValue> {
        let secure = if self.secure_cookie { "; Secure" } else { "" };
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
            self.max_age_seconds
        ))
        .ok()
    }

    /// `Set-Cookie` value that expires the session cookie.
    pub fn clear_cookie(&self) -> HeaderValue {
        let secure = if self.secure_cookie { "; Secure" } else { "" };
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{secure}"
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("storefront_session=; Path=/; Max-Age=0"))
    }
}

/// Pulls the raw session token from the bearer header, falling back to the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(role: Role, tenant_id: Option<Uuid>) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: Uuid::new_v4(),
            email: "staff@example.com".to_string(),
            name: Some("Staff Member".to_string()),
            password_hash: None,
            image: None,
            role,
            tenant_id,
            email_verified_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_decode_round_trip_claims() {
        let keys = SessionKeys::from_config(&AppConfig::default());
        let tenant = Uuid::new_v4();
        let user = test_user(Role::Staff, Some(tenant));

        let issued = keys.issue(&user).unwrap();
        let claims = keys.decode(&issued.token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.tenant_id, Some(tenant));
        assert_eq!(claims.exp - claims.iat, 2_592_000);
    }

    #[test]
    fn test_expired_session_rejected() {
        let config = AppConfig::default();
        let keys = SessionKeys::from_config(&config);
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4(),
            email: "old@example.com".to_string(),
            name: None,
            image: None,
            role: Role::Customer,
            tenant_id: None,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(keys.decode(&token), Err(SessionError::Expired)));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let keys = SessionKeys::from_config(&AppConfig::default());
        let other = SessionKeys::from_config(&AppConfig {
            jwt_secret: "another-secret-that-is-long-enough-to-pass".to_string(),
            ..AppConfig::default()
        });
        let issued = other.issue(&test_user(Role::SuperAdmin, None)).unwrap();

        assert!(matches!(
            keys.decode(&issued.token),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_role_defaults_to_customer() {
        let config = AppConfig::default();
        let keys = SessionKeys::from_config(&config);
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &serde_json::json!({
                "sub": Uuid::new_v4(),
                "email": "shopper@example.com",
                "iat": now,
                "exp": now + 60,
            }),
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        let claims = keys.decode(&token).unwrap();
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.tenant_id, None);
    }

    #[test]
    fn test_token_from_headers_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; storefront_session=cookie-token"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("cookie-token"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("header-token"));

        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let keys = SessionKeys::from_config(&AppConfig::default());
        let cookie = keys.session_cookie("abc").unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("storefront_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(keys.clear_cookie().to_str().unwrap().contains("Max-Age=0"));
    }
}
