//! # User Repository
//!
//! Account storage for shoppers and store operators.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{
    Role, User,
    user::{self, ActiveModel as UserActiveModel, Model as UserModel},
};

/// Data required to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

/// Filters for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub tenant_id: Option<Uuid>,
    pub role: Option<Role>,
    pub search: Option<String>,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Looks up an account by its normalised e-mail address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let now = Utc::now();
        let model = UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(normalize_email(&new_user.email)),
            name: Set(new_user.name),
            password_hash: Set(new_user.password_hash),
            image: Set(None),
            role: Set(new_user.role),
            tenant_id: Set(new_user.tenant_id),
            email_verified_at: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(self.db).await.map_err(|err| {
            match RepositoryError::database_error(err) {
                RepositoryError::Conflict(_) => {
                    RepositoryError::conflict("User with this email already exists")
                }
                other => other,
            }
        })
    }

    pub async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: String,
    ) -> Result<UserModel, RepositoryError> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User not found"))?;

        let mut active = user.into_active_model();
        active.password_hash = Set(Some(password_hash));
        active.updated_at = Set(Utc::now());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list(
        &self,
        filter: &UserFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<UserModel>, u64), RepositoryError> {
        let mut query = User::find().order_by_desc(user::Column::CreatedAt);

        if let Some(tenant_id) = filter.tenant_id {
            query = query.filter(user::Column::TenantId.eq(tenant_id));
        }
        if let Some(role) = filter.role {
            query = query.filter(user::Column::Role.eq(role));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(user::Column::Email))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(user::Column::Name))).like(pattern)),
            );
        }

        let paginator = query.paginate(self.db, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let users = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((users, total))
    }

    /// Customers registered under a tenant.
    pub async fn count_customers(&self, tenant_id: Uuid) -> Result<u64, RepositoryError> {
        User::find()
            .filter(user::Column::TenantId.eq(tenant_id))
            .filter(user::Column::Role.eq(Role::Customer))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

/// E-mail addresses are stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@Example.COM "), "admin@example.com");
    }
}
