//! Database migrations for the storefront service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_tenants;
mod m2024_01_01_000002_create_users;
mod m2024_01_01_000003_create_catalog;
mod m2024_01_01_000004_create_carts;
mod m2024_01_01_000005_create_orders;
mod m2024_01_01_000006_create_verification_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_tenants::Migration),
            Box::new(m2024_01_01_000002_create_users::Migration),
            Box::new(m2024_01_01_000003_create_catalog::Migration),
            Box::new(m2024_01_01_000004_create_carts::Migration),
            Box::new(m2024_01_01_000005_create_orders::Migration),
            Box::new(m2024_01_01_000006_create_verification_tokens::Migration),
        ]
    }
}
