//! Database seeding functionality
//!
//! Populates an empty database with a demo store: the "default" tenant, a
//! platform super admin, a store admin, two categories and a few products.
//! Every step checks for existing rows first, so seeding can run repeatedly.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::service::{AuthService, CreateUserInput};
use crate::config::AppConfig;
use crate::models::{Role, tenant};
use crate::repositories::{
    CategoryRepository, ProductRepository, TenantRepository, UserRepository,
    category::NewCategory, product::NewProduct, tenant::CreateTenantRequest,
};

pub const DEFAULT_TENANT_SLUG: &str = "default";
pub const SUPER_ADMIN_EMAIL: &str = "admin@example.com";
pub const STORE_ADMIN_EMAIL: &str = "store@example.com";

struct SampleProduct {
    name: &'static str,
    description: &'static str,
    price: f64,
    compare_price: f64,
    sku: &'static str,
    stock: i32,
    category: &'static str,
    featured: bool,
}

const SAMPLE_PRODUCTS: &[SampleProduct] = &[
    SampleProduct {
        name: "Wireless Headphones",
        description: "High-quality wireless headphones with noise cancellation",
        price: 99.99,
        compare_price: 129.99,
        sku: "WH-001",
        stock: 50,
        category: "electronics",
        featured: true,
    },
    SampleProduct {
        name: "Smartphone Case",
        description: "Durable protective case for smartphones",
        price: 19.99,
        compare_price: 24.99,
        sku: "SC-001",
        stock: 100,
        category: "electronics",
        featured: false,
    },
    SampleProduct {
        name: "Cotton T-Shirt",
        description: "Comfortable cotton t-shirt in various colors",
        price: 24.99,
        compare_price: 29.99,
        sku: "CT-001",
        stock: 200,
        category: "clothing",
        featured: false,
    },
];

/// Seeds the demo store.
///
/// Admin accounts are only created when `seed_admin_password` is configured.
pub async fn seed_demo_store(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    log::info!("Seeding demo store");

    let tenant = seed_tenant(db).await?;

    match config.seed_admin_password.as_deref() {
        Some(password) => {
            seed_user(db, config, SUPER_ADMIN_EMAIL, "Super Admin", password, Role::SuperAdmin, None)
                .await?;
            seed_user(
                db,
                config,
                STORE_ADMIN_EMAIL,
                "Store Admin",
                password,
                Role::TenantAdmin,
                Some(tenant.id),
            )
            .await?;
        }
        None => log::warn!("SEED_ADMIN_PASSWORD not set, skipping admin accounts"),
    }

    let electronics = seed_category(db, tenant.id, "Electronics", "electronics", "Electronic devices and gadgets").await?;
    let clothing = seed_category(db, tenant.id, "Clothing", "clothing", "Fashion and apparel").await?;

    let products = TenantRepository::new(db)
        .count_products(tenant.id)
        .await
        .context("counting seeded products")?;
    if products > 0 {
        log::info!("Store '{}' already has products, skipping", tenant.slug);
    } else {
        let repo = ProductRepository::new(db);
        for sample in SAMPLE_PRODUCTS {
            let category_id = match sample.category {
                "electronics" => electronics,
                _ => clothing,
            };
            repo.create(
                &tenant,
                NewProduct {
                    name: sample.name.to_string(),
                    description: Some(sample.description.to_string()),
                    price: sample.price,
                    compare_price: Some(sample.compare_price),
                    sku: Some(sample.sku.to_string()),
                    stock: sample.stock,
                    category_id: Some(category_id),
                    is_featured: Some(sample.featured),
                    ..NewProduct::default()
                },
            )
            .await
            .with_context(|| format!("seeding product {}", sample.sku))?;
            log::info!("Created product '{}'", sample.name);
        }
    }

    log::info!("Demo store seeding completed");
    Ok(())
}

async fn seed_tenant(db: &DatabaseConnection) -> Result<tenant::Model> {
    let repo = TenantRepository::new(db);
    if let Some(existing) = repo.find_by_slug(DEFAULT_TENANT_SLUG).await? {
        log::info!("Tenant '{}' already exists, skipping", DEFAULT_TENANT_SLUG);
        return Ok(existing);
    }

    let tenant = repo
        .create_tenant(CreateTenantRequest {
            name: "Default Store".to_string(),
            slug: Some(DEFAULT_TENANT_SLUG.to_string()),
            description: Some("Default e-commerce store".to_string()),
            plan: Some("free".to_string()),
            ..CreateTenantRequest::default()
        })
        .await
        .context("seeding default tenant")?;
    log::info!("Created tenant '{}'", tenant.name);
    Ok(tenant)
}

async fn seed_user(
    db: &DatabaseConnection,
    config: &AppConfig,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
    tenant_id: Option<Uuid>,
) -> Result<()> {
    if UserRepository::new(db).find_by_email(email).await?.is_some() {
        log::info!("User '{}' already exists, skipping", email);
        return Ok(());
    }

    AuthService::new(db, config)
        .create_user(CreateUserInput {
            email: email.to_string(),
            password: password.to_string(),
            name: Some(name.to_string()),
            tenant_id,
            role: Some(role),
        })
        .await
        .with_context(|| format!("seeding user {email}"))?;
    log::info!("Created {} user '{}'", role.as_str(), email);
    Ok(())
}

async fn seed_category(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    name: &str,
    slug: &str,
    description: &str,
) -> Result<Uuid> {
    let repo = CategoryRepository::new(db);
    if let Some(existing) = repo.find_by_reference(tenant_id, slug).await? {
        return Ok(existing.id);
    }

    let category = repo
        .create(
            tenant_id,
            NewCategory {
                name: name.to_string(),
                slug: Some(slug.to_string()),
                description: Some(description.to_string()),
                image: None,
                parent_id: None,
                is_active: Some(true),
            },
        )
        .await
        .with_context(|| format!("seeding category {slug}"))?;
    log::info!("Created category '{}'", category.name);
    Ok(category.id)
}
