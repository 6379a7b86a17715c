//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM operations
//! for database entities. Everything below the tenant is queried with an explicit
//! tenant id so one store never reads another store's rows.

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod tenant;
pub mod user;
pub mod verification_token;

pub use cart::CartRepository;
pub use category::CategoryRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
pub use tenant::TenantRepository;
pub use user::UserRepository;
pub use verification_token::VerificationTokenRepository;
