//! Test utilities for database and HTTP testing.
//!
//! Sets up an in-memory SQLite database with migrations applied, builds the
//! application router on top of it and offers small fixture helpers.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront::{
    auth::service::{AuthService, CreateUserInput},
    config::AppConfig,
    models::{Role, product, tenant, user},
    repositories::{
        ProductRepository, TenantRepository, product::NewProduct, tenant::CreateTenantRequest,
    },
    server::{AppState, create_app},
};

pub const TEST_PASSWORD: &str = "Password123!";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        jwt_secret: "integration-test-signing-secret-0123456789".to_string(),
        expose_reset_tokens: true,
        ..AppConfig::default()
    }
}

/// The router plus direct access to its state for fixtures.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

/// A decoded HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let state = AppState::new(config, db);
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Signs a session token for `user` without going through `/login`.
    pub fn token_for(&self, user: &user::Model) -> String {
        self.state
            .sessions
            .issue(user)
            .expect("session issued")
            .token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        tenant_id: Option<Uuid>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(tenant_id) = tenant_id {
            builder = builder.header("x-tenant-id", tenant_id.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>, tenant_id: Option<Uuid>) -> TestResponse {
        self.request(Method::GET, uri, token, tenant_id, None).await
    }

    pub async fn post(
        &self,
        uri: &str,
        token: Option<&str>,
        tenant_id: Option<Uuid>,
        body: Value,
    ) -> TestResponse {
        self.request(Method::POST, uri, token, tenant_id, Some(body))
            .await
    }

    pub async fn put(
        &self,
        uri: &str,
        token: Option<&str>,
        tenant_id: Option<Uuid>,
        body: Value,
    ) -> TestResponse {
        self.request(Method::PUT, uri, token, tenant_id, Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>, tenant_id: Option<Uuid>) -> TestResponse {
        self.request(Method::DELETE, uri, token, tenant_id, None)
            .await
    }
}

pub async fn create_tenant(db: &DatabaseConnection, slug: &str, plan: &str) -> Result<tenant::Model> {
    Ok(TenantRepository::new(db)
        .create_tenant(CreateTenantRequest {
            name: format!("Store {slug}"),
            slug: Some(slug.to_string()),
            plan: Some(plan.to_string()),
            ..CreateTenantRequest::default()
        })
        .await?)
}

pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    tenant_id: Option<Uuid>,
) -> Result<user::Model> {
    Ok(AuthService::new(db, &test_config())
        .create_user(CreateUserInput {
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            name: None,
            tenant_id,
            role: Some(role),
        })
        .await?)
}

pub async fn create_product(
    db: &DatabaseConnection,
    tenant: &tenant::Model,
    name: &str,
    price: f64,
    stock: i32,
) -> Result<product::Model> {
    Ok(ProductRepository::new(db)
        .create(
            tenant,
            NewProduct {
                name: name.to_string(),
                description: Some(format!("{name} description for tests")),
                price,
                stock,
                ..NewProduct::default()
            },
        )
        .await?)
}
