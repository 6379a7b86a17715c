//! # Server Configuration
//!
//! This module contains the router, shared state and server lifecycle for the
//! storefront API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{SessionKeys, TENANT_HEADER, require_super_admin, require_tenant_admin};
use crate::config::AppConfig;
use crate::handlers::{self, admin, auth, cart, categories, dashboard, orders, products, tenants};
use crate::notifications::{LogNotifier, Notifier};
use crate::telemetry::trace_id_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub sessions: SessionKeys,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Self {
        let sessions = SessionKeys::from_config(&config);
        Self {
            config: Arc::new(config),
            db,
            sessions,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
        .route("/change-password", post(auth::change_password))
        .route("/reset-password", post(auth::reset_password));

    let tenant_routes = Router::new()
        .route("/", get(tenants::list_tenants).post(tenants::create_tenant))
        .route(
            "/{id}",
            get(tenants::get_tenant)
                .put(tenants::update_tenant)
                .delete(tenants::delete_tenant),
        )
        .route(
            "/{id}/settings",
            get(tenants::get_settings).put(tenants::update_settings),
        )
        .route("/{id}/analytics", get(tenants::tenant_analytics));

    let product_routes = Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/{id}/inventory", put(products::update_inventory));

    let category_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        );

    let cart_routes = Router::new()
        .route("/", get(cart::get_cart))
        .route("/add", post(cart::add_to_cart))
        .route(
            "/update",
            put(cart::update_cart_item).post(cart::update_cart_item),
        )
        .route("/remove", post(cart::remove_from_cart))
        .route("/clear", post(cart::clear_cart));

    let order_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/{id}", get(orders::get_order).put(orders::update_order))
        .route("/{id}/cancel", post(orders::cancel_order));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_super_admin,
        ));

    let dashboard_routes = Router::new()
        .route("/summary", get(dashboard::summary))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_tenant_admin,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/auth", auth_routes)
        .nest("/api/tenants", tenant_routes)
        .nest("/api/products", product_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/cart", cart_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/dashboard", dashboard_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        if config.is_development() {
            tracing::warn!("CORS: permissive mode, all origins allowed");
            return CorsLayer::permissive();
        }
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(TENANT_HEADER),
        ])
        .allow_credentials(true)
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .context("Invalid server address")?;
    let profile = config.profile.clone();

    let app = create_app(AppState::new(config, db));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, profile = %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting shutdown"),
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::session,
        crate::handlers::auth::change_password,
        crate::handlers::auth::reset_password,
        crate::handlers::tenants::list_tenants,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::update_tenant,
        crate::handlers::tenants::delete_tenant,
        crate::handlers::tenants::get_settings,
        crate::handlers::tenants::update_settings,
        crate::handlers::tenants::tenant_analytics,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::update_inventory,
        crate::handlers::products::delete_product,
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_to_cart,
        crate::handlers::cart::update_cart_item,
        crate::handlers::cart::remove_from_cart,
        crate::handlers::cart::clear_cart,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::admin::list_users,
        crate::handlers::admin::create_user,
        crate::handlers::dashboard::summary,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Role,
            crate::models::OrderStatus,
            crate::models::PaymentStatus,
            crate::models::tenant::StoreSettings,
            crate::error::ApiError,
            crate::handlers::HealthStatus,
            crate::handlers::types::Pagination,
            crate::auth::SessionClaims,
            crate::analytics::SalesSummary,
            crate::repositories::product::ProductSort,
            crate::repositories::product::SortOrder,
            crate::repositories::order::OrderSort,
            crate::handlers::auth::UserProfile,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::auth::SessionResponse,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::auth::ResetPasswordRequest,
            crate::handlers::auth::ResetPasswordResponse,
            crate::handlers::tenants::TenantSummary,
            crate::handlers::tenants::PlanLimits,
            crate::handlers::tenants::TenantResponse,
            crate::handlers::tenants::CreateTenantRequestDto,
            crate::handlers::tenants::UpdateTenantRequestDto,
            crate::handlers::products::CategoryRef,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::handlers::products::InventoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::categories::CreateCategoryRequest,
            crate::handlers::categories::UpdateCategoryRequest,
            crate::handlers::cart::CartResponse,
            crate::handlers::cart::CartItemResponse,
            crate::handlers::cart::AddToCartRequest,
            crate::handlers::cart::UpdateCartItemRequest,
            crate::handlers::cart::RemoveCartItemRequest,
            crate::handlers::orders::OrderSummary,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::CheckoutRequest,
            crate::handlers::orders::UpdateOrderRequest,
            crate::handlers::admin::CreateUserRequest,
            crate::handlers::dashboard::DashboardSummary,
            crate::handlers::dashboard::LowStockProduct,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Accounts, sessions and password resets"),
        (name = "tenants", description = "Stores and their settings"),
        (name = "products", description = "Catalog"),
        (name = "categories", description = "Catalog categories"),
        (name = "cart", description = "Shopping cart"),
        (name = "orders", description = "Checkout and order management"),
        (name = "admin", description = "Platform administration"),
        (name = "dashboard", description = "Store dashboard"),
    ),
    info(
        title = "Storefront API",
        description = "Multi-tenant e-commerce storefront and store administration API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
