//! # Data Models
//!
//! SeaORM entities for the storefront plus shared response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod enums;
pub mod order;
pub mod order_item;
pub mod product;
pub mod tenant;
pub mod user;
pub mod verification_token;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use enums::{OrderStatus, PaymentStatus, Role};
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
pub use tenant::Entity as Tenant;
pub use user::Entity as User;
pub use verification_token::Entity as VerificationToken;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "storefront".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
