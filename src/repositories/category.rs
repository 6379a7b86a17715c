//! # Category Repository
//!
//! Tenant-scoped product categories. Slugs are unique per tenant and parents
//! must belong to the same tenant.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::formatting::generate_slug;
use crate::models::{
    Category, Product,
    category::{self, ActiveModel as CategoryActiveModel, Model as CategoryModel},
    product,
};
use crate::validation::is_valid_slug;

const CATEGORY_NAME_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Partial update. `parent_id: Some(None)` detaches the category from its parent.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone)]
pub struct CategoryWithCount {
    pub category: CategoryModel,
    pub product_count: u64,
}

pub struct CategoryRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<CategoryWithCount>, RepositoryError> {
        let mut query = Category::find()
            .filter(category::Column::TenantId.eq(tenant_id))
            .order_by_asc(category::Column::Name);
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }

        let categories = query
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let product_categories: Vec<Option<Uuid>> = Product::find()
            .select_only()
            .column(product::Column::CategoryId)
            .filter(product::Column::TenantId.eq(tenant_id))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for category_id in product_categories.into_iter().flatten() {
            *counts.entry(category_id).or_insert(0) += 1;
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryWithCount {
                product_count: counts.get(&category.id).copied().unwrap_or(0),
                category,
            })
            .collect())
    }

    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CategoryModel>, RepositoryError> {
        Category::find_by_id(id)
            .filter(category::Column::TenantId.eq(tenant_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Resolves a category reference given either as an ID or as a slug.
    pub async fn find_by_reference(
        &self,
        tenant_id: Uuid,
        reference: &str,
    ) -> Result<Option<CategoryModel>, RepositoryError> {
        if let Ok(id) = reference.parse::<Uuid>() {
            return self.find(tenant_id, id).await;
        }

        Category::find()
            .filter(category::Column::TenantId.eq(tenant_id))
            .filter(category::Column::Slug.eq(reference))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        input: NewCategory,
    ) -> Result<CategoryModel, RepositoryError> {
        let name = validate_category_name(&input.name)?;
        let slug = self
            .checked_slug(tenant_id, input.slug.as_deref(), &name, None)
            .await?;
        if let Some(parent_id) = input.parent_id {
            self.ensure_parent(tenant_id, parent_id, None).await?;
        }

        let now = Utc::now();
        CategoryActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            parent_id: Set(input.parent_id),
            name: Set(name),
            slug: Set(slug),
            description: Set(input.description),
            image: Set(input.image),
            is_active: Set(input.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<CategoryModel, RepositoryError> {
        let existing = self
            .find(tenant_id, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Category not found"))?;

        let mut active = existing.clone().into_active_model();
        if let Some(name) = update.name {
            active.name = Set(validate_category_name(&name)?);
        }
        if let Some(slug) = update.slug {
            let slug = self
                .checked_slug(tenant_id, Some(&slug), &existing.name, Some(id))
                .await?;
            active.slug = Set(slug);
        }
        if let Some(description) = update.description {
            active.description = Set(Some(description));
        }
        if let Some(image) = update.image {
            active.image = Set(Some(image));
        }
        if let Some(parent_id) = update.parent_id {
            if let Some(parent_id) = parent_id {
                self.ensure_parent(tenant_id, parent_id, Some(id)).await?;
            }
            active.parent_id = Set(parent_id);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), RepositoryError> {
        let category = self
            .find(tenant_id, id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Category not found"))?;

        Product::update_many()
            .col_expr(product::Column::CategoryId, Expr::value(Option::<Uuid>::None))
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::CategoryId.eq(id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        category
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    async fn checked_slug(
        &self,
        tenant_id: Uuid,
        requested: Option<&str>,
        name: &str,
        current_id: Option<Uuid>,
    ) -> Result<String, RepositoryError> {
        let slug = match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => generate_slug(name),
        };
        if !is_valid_slug(&slug) {
            return Err(RepositoryError::validation_error("Invalid category slug"));
        }

        let clash = Category::find()
            .filter(category::Column::TenantId.eq(tenant_id))
            .filter(category::Column::Slug.eq(slug.as_str()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        match clash {
            Some(other) if Some(other.id) != current_id => Err(RepositoryError::conflict(
                "A category with this slug already exists",
            )),
            _ => Ok(slug),
        }
    }

    async fn ensure_parent(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        current_id: Option<Uuid>,
    ) -> Result<(), RepositoryError> {
        if Some(parent_id) == current_id {
            return Err(RepositoryError::validation_error(
                "A category cannot be its own parent",
            ));
        }
        let Some(parent) = self.find(tenant_id, parent_id).await? else {
            return Err(RepositoryError::validation_error(
                "Parent category not found in this store",
            ));
        };

        // A new category cannot close a loop; only a re-parented one can.
        let Some(current_id) = current_id else {
            return Ok(());
        };
        let mut seen = HashSet::from([parent.id]);
        let mut next = parent.parent_id;
        while let Some(ancestor_id) = next {
            if ancestor_id == current_id {
                return Err(RepositoryError::validation_error(
                    "A category cannot be moved under one of its own subcategories",
                ));
            }
            if !seen.insert(ancestor_id) {
                break;
            }
            next = self
                .find(tenant_id, ancestor_id)
                .await?
                .and_then(|ancestor| ancestor.parent_id);
        }
        Ok(())
    }
}

fn validate_category_name(name: &str) -> Result<String, RepositoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error("Category name is required"));
    }
    if trimmed.chars().count() > CATEGORY_NAME_MAX_LENGTH {
        return Err(RepositoryError::validation_error(
            "Category name must be less than 100 characters",
        ));
    }
    Ok(trimmed.to_string())
}
