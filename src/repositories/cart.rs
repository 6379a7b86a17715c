//! # Cart Repository
//!
//! One open cart per (tenant, user). Lines are priced from the live catalog
//! until checkout snapshots them into an order.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::commerce::{
    LineItem, OrderTotals, calculate_cart_total, calculate_tax, qualifies_for_free_shipping,
};
use crate::error::RepositoryError;
use crate::models::{
    Cart, CartItem, Product, cart, cart_item,
    product::{self, Model as ProductModel},
    tenant::StoreSettings,
};

pub const NOT_ENOUGH_STOCK: &str = "Requested quantity not available in stock";

/// A cart line joined with its product.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: cart_item::Model,
    pub product: ProductModel,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.product.price * f64::from(self.item.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct CartContents {
    pub cart: cart::Model,
    pub lines: Vec<CartLine>,
}

impl CartContents {
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|line| i64::from(line.item.quantity)).sum()
    }

    /// Subtotal, tax and shipping under the store's settings. No discount applies to carts.
    pub fn totals(&self, settings: &StoreSettings) -> OrderTotals {
        let items: Vec<LineItem> = self
            .lines
            .iter()
            .map(|line| LineItem {
                unit_price: line.product.price,
                quantity: line.item.quantity,
            })
            .collect();
        cart_totals(&items, settings)
    }
}

/// Cart arithmetic: shipping is waived at or above the free-shipping threshold.
pub fn cart_totals(items: &[LineItem], settings: &StoreSettings) -> OrderTotals {
    let subtotal = calculate_cart_total(items);
    let tax = calculate_tax(subtotal, settings.tax_rate);
    let shipping = if items.is_empty()
        || qualifies_for_free_shipping(subtotal, settings.free_shipping_threshold)
    {
        0.0
    } else {
        settings.shipping_flat_rate
    };

    OrderTotals {
        subtotal,
        tax,
        shipping,
        discount: 0.0,
        total: subtotal + tax + shipping,
    }
    .rounded()
}

pub struct CartRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CartRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_cart(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<cart::Model>, RepositoryError> {
        Cart::find()
            .filter(cart::Column::TenantId.eq(tenant_id))
            .filter(cart::Column::UserId.eq(user_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn get_or_create(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<cart::Model, RepositoryError> {
        if let Some(existing) = self.find_cart(tenant_id, user_id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// The caller's cart with its lines, oldest line first.
    pub async fn contents(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<CartContents, RepositoryError> {
        let cart = self.get_or_create(tenant_id, user_id).await?;
        let lines = self.lines(cart.id).await?;
        Ok(CartContents { cart, lines })
    }

    async fn lines(&self, cart_id: Uuid) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = CartItem::find()
            .find_also_related(Product)
            .filter(cart_item::Column::CartId.eq(cart_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| product.map(|product| CartLine { item, product }))
            .collect())
    }

    /// Adds to the line for `product_id`, creating it when absent.
    pub async fn add_item(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartContents, RepositoryError> {
        if quantity < 1 {
            return Err(RepositoryError::validation_error(
                "Quantity must be at least 1",
            ));
        }

        let product = self.purchasable_product(tenant_id, product_id).await?;
        let cart = self.get_or_create(tenant_id, user_id).await?;
        let existing = self.find_line(cart.id, product_id).await?;

        let requested = existing
            .as_ref()
            .map_or(quantity, |line| line.quantity.saturating_add(quantity));
        ensure_available(&product, requested)?;

        let now = Utc::now();
        match existing {
            Some(line) => {
                let mut active = line.into_active_model();
                active.quantity = Set(requested);
                active.updated_at = Set(now);
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    cart_id: Set(cart.id),
                    product_id: Set(product_id),
                    quantity: Set(requested),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(self.db)
                .await
                .map_err(RepositoryError::database_error)?;
            }
        }

        self.touch(cart).await?;
        self.contents(tenant_id, user_id).await
    }

    /// Sets a line's quantity; zero removes the line.
    pub async fn update_item(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartContents, RepositoryError> {
        if quantity < 0 {
            return Err(RepositoryError::validation_error(
                "Quantity cannot be negative",
            ));
        }
        if quantity == 0 {
            return self.remove_item(tenant_id, user_id, product_id).await;
        }

        let cart = self.get_or_create(tenant_id, user_id).await?;
        let line = self
            .find_line(cart.id, product_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Item not found in cart"))?;
        let product = self.purchasable_product(tenant_id, product_id).await?;
        ensure_available(&product, quantity)?;

        let mut active = line.into_active_model();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        self.touch(cart).await?;
        self.contents(tenant_id, user_id).await
    }

    pub async fn remove_item(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartContents, RepositoryError> {
        let cart = self.get_or_create(tenant_id, user_id).await?;
        let line = self
            .find_line(cart.id, product_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Item not found in cart"))?;

        line.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        self.touch(cart).await?;
        self.contents(tenant_id, user_id).await
    }

    pub async fn clear(&self, tenant_id: Uuid, user_id: Uuid) -> Result<(), RepositoryError> {
        if let Some(cart) = self.find_cart(tenant_id, user_id).await? {
            CartItem::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(self.db)
                .await
                .map_err(RepositoryError::database_error)?;
        }
        Ok(())
    }

    /// Carts in the tenant that still hold at least one line.
    pub async fn count_open_carts(&self, tenant_id: Uuid) -> Result<u64, RepositoryError> {
        let cart_ids: Vec<Uuid> = CartItem::find()
            .inner_join(Cart)
            .filter(cart::Column::TenantId.eq(tenant_id))
            .select_only()
            .column(cart_item::Column::CartId)
            .distinct()
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(cart_ids.len() as u64)
    }

    async fn find_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<cart_item::Model>, RepositoryError> {
        CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn purchasable_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductModel, RepositoryError> {
        Product::find_by_id(product_id)
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::IsActive.eq(true))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Product not found"))
    }

    async fn touch(&self, cart: cart::Model) -> Result<(), RepositoryError> {
        let mut active = cart.into_active_model();
        active.updated_at = Set(Utc::now());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

/// Tracked products cannot be put in a cart beyond their stock.
pub fn ensure_available(product: &ProductModel, quantity: i32) -> Result<(), RepositoryError> {
    if product.track_inventory && quantity > product.stock {
        return Err(RepositoryError::validation_error(NOT_ENOUGH_STOCK));
    }
    Ok(())
}
