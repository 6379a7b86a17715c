//! # Tenant Repository
//!
//! CRUD for stores (tenants), including their plan limits and the settings
//! document.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::commerce::{SubscriptionPlan, subscription_plan};
use crate::error::RepositoryError;
use crate::formatting::generate_slug;
use crate::models::{
    Product, Tenant, product,
    tenant::{self, ActiveModel as TenantActiveModel, Model as TenantModel, StoreSettings},
};
use crate::validation::is_valid_slug;

const TENANT_NAME_MAX_LENGTH: usize = 255;

/// Request data for creating a new tenant
#[derive(Debug, Clone, Default)]
pub struct CreateTenantRequest {
    pub name: String,
    /// Derived from the name when absent
    pub slug: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    /// Plan key; defaults to `free`
    pub plan: Option<String>,
    pub settings: Option<StoreSettings>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
    pub plan: Option<String>,
    pub subscription_status: Option<String>,
}

/// Repository for Tenant database operations
pub struct TenantRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TenantRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_tenant(
        &self,
        request: CreateTenantRequest,
    ) -> Result<TenantModel, RepositoryError> {
        let name = validate_tenant_name(&request.name)?;
        let slug = match request.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => generate_slug(&name),
        };
        if !is_valid_slug(&slug) {
            return Err(RepositoryError::validation_error(
                "Slug may only contain lowercase letters, numbers and single hyphens",
            ));
        }

        if self.find_by_slug(&slug).await?.is_some() {
            return Err(RepositoryError::conflict(
                "A store with this slug already exists",
            ));
        }

        let plan = resolve_plan(request.plan.as_deref().unwrap_or("free"))?;
        let settings = serde_json::to_value(request.settings.unwrap_or_default())
            .map_err(|err| RepositoryError::Internal(err.to_string()))?;
        let now = Utc::now();

        let tenant = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            domain: Set(request.domain.filter(|d| !d.trim().is_empty())),
            description: Set(request.description),
            logo: Set(request.logo),
            settings: Set(Some(settings)),
            subscription_tier: Set(plan.id.to_string()),
            subscription_status: Set("active".to_string()),
            max_products: Set(plan.max_products),
            max_customers: Set(plan.max_customers),
            max_storage_mb: Set(plan.max_storage_mb),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = tenant
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(tenant_id = %created.id, slug = %created.slug, plan = plan.id, "Tenant created");
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<TenantModel>, RepositoryError> {
        Tenant::find_by_id(tenant_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantModel>, RepositoryError> {
        Tenant::find()
            .filter(tenant::Column::Slug.eq(slug))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Stores open for business, alphabetically.
    pub async fn list_active(&self) -> Result<Vec<TenantModel>, RepositoryError> {
        Tenant::find()
            .filter(tenant::Column::SubscriptionStatus.eq("active"))
            .order_by_asc(tenant::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_tenant(
        &self,
        tenant_id: Uuid,
        request: UpdateTenantRequest,
    ) -> Result<TenantModel, RepositoryError> {
        let tenant = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;

        let mut active = tenant.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(validate_tenant_name(&name)?);
        }
        if let Some(domain) = request.domain {
            active.domain = Set(Some(domain).filter(|d| !d.trim().is_empty()));
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(logo) = request.logo {
            active.logo = Set(Some(logo));
        }
        if let Some(plan) = request.plan {
            let plan = resolve_plan(&plan)?;
            active.subscription_tier = Set(plan.id.to_string());
            active.max_products = Set(plan.max_products);
            active.max_customers = Set(plan.max_customers);
            active.max_storage_mb = Set(plan.max_storage_mb);
        }
        if let Some(status) = request.subscription_status {
            active.subscription_status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update_settings(
        &self,
        tenant_id: Uuid,
        settings: &StoreSettings,
    ) -> Result<TenantModel, RepositoryError> {
        let tenant = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;

        let document =
            serde_json::to_value(settings).map_err(|err| RepositoryError::Internal(err.to_string()))?;

        let mut active = tenant.into_active_model();
        active.settings = Set(Some(document));
        active.updated_at = Set(Utc::now());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete_tenant(&self, tenant_id: Uuid) -> Result<(), RepositoryError> {
        let tenant = self
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Tenant not found"))?;

        tenant
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(tenant_id = %tenant_id, "Tenant deleted");
        Ok(())
    }

    pub async fn count_products(&self, tenant_id: Uuid) -> Result<u64, RepositoryError> {
        Product::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn resolve_plan(id: &str) -> Result<&'static SubscriptionPlan, RepositoryError> {
    subscription_plan(id).ok_or_else(|| {
        RepositoryError::validation_error(format!(
            "Unknown plan '{id}'; expected free, starter or professional"
        ))
    })
}

fn validate_tenant_name(name: &str) -> Result<String, RepositoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error("Store name is required"));
    }
    if trimmed.chars().count() > TENANT_NAME_MAX_LENGTH {
        return Err(RepositoryError::validation_error(
            "Store name cannot exceed 255 characters",
        ));
    }
    Ok(trimmed.to_string())
}
