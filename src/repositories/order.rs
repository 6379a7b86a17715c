//! # Order Repository
//!
//! Checkout, order listings, fulfilment updates and cancellation. Checkout
//! and cancellation touch several tables and run inside a transaction.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, Order as SortDirection, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::Expr,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analytics::OrderFact;
use crate::commerce::{calculate_final_total, generate_order_number, qualifies_for_free_shipping};
use crate::error::RepositoryError;
use crate::models::{
    Cart, CartItem, Order, OrderItem, OrderStatus, PaymentStatus, Product, cart, cart_item,
    order::{self, ActiveModel as OrderActiveModel, Model as OrderModel},
    order_item, product,
    tenant::StoreSettings,
};
use crate::validation::ORDER_NOTES_MAX_LENGTH;

use super::cart::NOT_ENOUGH_STOCK;
use super::product::SortOrder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSort {
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    Total,
    #[serde(alias = "orderNumber")]
    OrderNumber,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restricts the listing to one purchaser; set for customers.
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub customer_email: Option<String>,
    pub order_number: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub sort_by: OrderSort,
    pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutInput {
    pub customer_email: String,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub payment_method: Option<String>,
    pub shipping_method: Option<String>,
    pub customer_notes: Option<String>,
}

/// Staff-side changes to an order.
#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub shipping_method: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<order_item::Model>,
}

pub struct OrderRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OrderRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Turns the user's cart into an order. Stock is re-checked against the
    /// current catalog, prices are copied onto the order lines and the cart is
    /// emptied, all in one transaction.
    pub async fn checkout(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        settings: &StoreSettings,
        input: CheckoutInput,
    ) -> Result<OrderWithItems, RepositoryError> {
        validate_checkout(&input)?;

        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let cart = Cart::find()
            .filter(cart::Column::TenantId.eq(tenant_id))
            .filter(cart::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        let Some(cart) = cart else {
            return Err(RepositoryError::validation_error("Cart is empty"));
        };

        let lines = CartItem::find()
            .find_also_related(Product)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        if lines.is_empty() {
            return Err(RepositoryError::validation_error("Cart is empty"));
        }

        let mut purchases = Vec::with_capacity(lines.len());
        for (item, product) in lines {
            let product = product
                .filter(|p| p.is_active && p.tenant_id == tenant_id)
                .ok_or_else(|| {
                    RepositoryError::validation_error("A product in the cart is no longer available")
                })?;
            if product.track_inventory && item.quantity > product.stock {
                return Err(RepositoryError::validation_error(format!(
                    "{NOT_ENOUGH_STOCK}: {}",
                    product.name
                )));
            }
            purchases.push((item, product));
        }

        let subtotal: f64 = purchases
            .iter()
            .map(|(item, product)| product.price * f64::from(item.quantity))
            .sum();
        let shipping = if qualifies_for_free_shipping(subtotal, settings.free_shipping_threshold) {
            0.0
        } else {
            settings.shipping_flat_rate
        };
        let totals = calculate_final_total(subtotal, settings.tax_rate, shipping, 0.0).rounded();

        let now = Utc::now();
        let order = OrderActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            user_id: Set(Some(user_id)),
            order_number: Set(generate_order_number()),
            customer_email: Set(input.customer_email.trim().to_lowercase()),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            subtotal: Set(totals.subtotal),
            tax_amount: Set(totals.tax),
            shipping_amount: Set(totals.shipping),
            discount_amount: Set(totals.discount),
            total: Set(totals.total),
            shipping_address: Set(input.shipping_address),
            billing_address: Set(input.billing_address),
            payment_method: Set(input.payment_method),
            tracking_number: Set(None),
            shipping_method: Set(input.shipping_method),
            shipped_at: Set(None),
            delivered_at: Set(None),
            customer_notes: Set(input.customer_notes),
            admin_notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        let mut items = Vec::with_capacity(purchases.len());
        for (item, product) in purchases {
            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(Some(product.id)),
                product_name: Set(product.name.clone()),
                sku: Set(product.sku.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(product.price),
                total: Set(crate::commerce::round_currency(
                    product.price * f64::from(item.quantity),
                )),
            }
            .insert(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
            items.push(line);

            if product.track_inventory {
                let taken = Product::update_many()
                    .col_expr(
                        product::Column::Stock,
                        Expr::col(product::Column::Stock).sub(item.quantity),
                    )
                    .col_expr(product::Column::UpdatedAt, Expr::value(now))
                    .filter(product::Column::Id.eq(product.id))
                    .filter(product::Column::Stock.gte(item.quantity))
                    .exec(&txn)
                    .await
                    .map_err(RepositoryError::database_error)?;
                if taken.rows_affected == 0 {
                    return Err(RepositoryError::validation_error(format!(
                        "{NOT_ENOUGH_STOCK}: {}",
                        product.name
                    )));
                }
            }
        }

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;

        tracing::info!(
            tenant_id = %tenant_id,
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.total,
            "Order placed"
        );
        Ok(OrderWithItems { order, items })
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filter: &OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<OrderModel>, u64), RepositoryError> {
        let mut query = Order::find().filter(order::Column::TenantId.eq(tenant_id));

        if let Some(user_id) = filter.user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }
        if let Some(payment_status) = filter.payment_status {
            query = query.filter(order::Column::PaymentStatus.eq(payment_status));
        }
        if let Some(email) = filter.customer_email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            query = query.filter(order::Column::CustomerEmail.contains(email.to_lowercase()));
        }
        if let Some(number) = filter.order_number.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            query = query.filter(order::Column::OrderNumber.contains(number));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(order::Column::CreatedAt.lte(to));
        }

        let direction: SortDirection = filter.sort_order.into();
        query = match filter.sort_by {
            OrderSort::CreatedAt => query.order_by(order::Column::CreatedAt, direction),
            OrderSort::Total => query.order_by(order::Column::Total, direction),
            OrderSort::OrderNumber => query.order_by(order::Column::OrderNumber, direction),
        };

        let paginator = query.paginate(self.db, limit.max(1));
        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let orders = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((orders, total))
    }

    pub async fn find(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let order = Order::find_by_id(id)
            .filter(order::Column::TenantId.eq(tenant_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        match order {
            Some(order) => {
                let items = items_of(self.db, order.id).await?;
                Ok(Some(OrderWithItems { order, items }))
            }
            None => Ok(None),
        }
    }

    /// Applies staff changes. Delivered and void orders keep their status;
    /// moving an order to CANCELLED or REFUNDED returns its stock.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        update: OrderUpdate,
    ) -> Result<OrderModel, RepositoryError> {
        if let Some(notes) = &update.admin_notes
            && notes.chars().count() > ORDER_NOTES_MAX_LENGTH
        {
            return Err(RepositoryError::validation_error(
                "Admin notes must be less than 500 characters",
            ));
        }

        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = Order::find_by_id(id)
            .filter(order::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Order not found"))?;

        let previous = existing.status;
        let target = update.status.filter(|status| *status != previous);
        if target.is_some() && (previous.is_void() || previous == OrderStatus::Delivered) {
            return Err(RepositoryError::validation_error(format!(
                "Order status can no longer be changed from {}",
                previous.as_str()
            )));
        }

        let now = Utc::now();
        if let Some(status) = target {
            claim_status(&txn, &existing, status, now).await?;
            if status.is_void() {
                restock(&txn, existing.id, now).await?;
            }
        }

        let mut active = existing.into_active_model();
        if let Some(status) = target {
            active.status = Set(status);
            match status {
                OrderStatus::Shipped => active.shipped_at = Set(Some(now)),
                OrderStatus::Delivered => active.delivered_at = Set(Some(now)),
                _ => {}
            }
        }
        if let Some(payment_status) = update.payment_status {
            active.payment_status = Set(payment_status);
        }
        if let Some(tracking_number) = update.tracking_number {
            active.tracking_number = Set(Some(tracking_number));
        }
        if let Some(shipping_method) = update.shipping_method {
            active.shipping_method = Set(Some(shipping_method));
        }
        if let Some(admin_notes) = update.admin_notes {
            active.admin_notes = Set(Some(admin_notes));
        }
        active.updated_at = Set(now);

        let updated = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        txn.commit().await.map_err(RepositoryError::database_error)?;

        if let Some(status) = target {
            tracing::info!(
                order_id = %id,
                from = previous.as_str(),
                to = status.as_str(),
                "Order status changed"
            );
        }
        Ok(updated)
    }

    /// Cancels an order and puts tracked stock back on the shelf.
    /// `by_staff` lifts the PENDING/CONFIRMED restriction.
    pub async fn cancel(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        by_staff: bool,
    ) -> Result<OrderModel, RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        let existing = Order::find_by_id(id)
            .filter(order::Column::TenantId.eq(tenant_id))
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Order not found"))?;

        if existing.status.is_void() {
            return Err(RepositoryError::validation_error(
                "Order is already cancelled",
            ));
        }
        if !by_staff && !existing.status.is_customer_cancellable() {
            return Err(RepositoryError::validation_error(
                "Order can no longer be cancelled",
            ));
        }
        if existing.status == OrderStatus::Delivered {
            return Err(RepositoryError::validation_error(
                "Delivered orders cannot be cancelled",
            ));
        }

        let now = Utc::now();
        claim_status(&txn, &existing, OrderStatus::Cancelled, now).await?;
        restock(&txn, existing.id, now).await?;

        txn.commit().await.map_err(RepositoryError::database_error)?;

        tracing::info!(tenant_id = %tenant_id, order_id = %id, by_staff, "Order cancelled");
        Ok(OrderModel {
            status: OrderStatus::Cancelled,
            updated_at: now,
            ..existing
        })
    }

    /// Orders created in `[from, to)` reduced to what the sales summary needs.
    pub async fn facts_between(
        &self,
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<OrderFact>, RepositoryError> {
        let orders = Order::find()
            .filter(order::Column::TenantId.eq(tenant_id))
            .filter(order::Column::CreatedAt.gte(from))
            .filter(order::Column::CreatedAt.lt(to))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(orders
            .into_iter()
            .map(|order| OrderFact {
                created_at: order.created_at,
                total: order.total,
                customer_email: order.customer_email,
                status: order.status,
            })
            .collect())
    }

    pub async fn recent(&self, tenant_id: Uuid, limit: u64) -> Result<Vec<OrderModel>, RepositoryError> {
        let (orders, _) = self
            .list(tenant_id, &OrderFilter::default(), 1, limit)
            .await?;
        Ok(orders)
    }

    /// Active tracked products at or below their low-stock threshold.
    pub async fn low_stock_products(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<product::Model>, RepositoryError> {
        let products = Product::find()
            .filter(product::Column::TenantId.eq(tenant_id))
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::TrackInventory.eq(true))
            .order_by_asc(product::Column::Stock)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(products
            .into_iter()
            .filter(|p| p.stock <= p.low_stock_threshold)
            .collect())
    }
}

async fn items_of<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<order_item::Model>, RepositoryError> {
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await
        .map_err(RepositoryError::database_error)
}

/// Moves the order to `status` only if nobody changed it since it was read.
async fn claim_status<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(status))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Status.eq(order.status))
        .exec(conn)
        .await
        .map_err(RepositoryError::database_error)?;
    if result.rows_affected == 0 {
        return Err(RepositoryError::conflict(
            "Order was changed by another request",
        ));
    }
    Ok(())
}

async fn restock<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    for item in items_of(conn, order_id).await? {
        let Some(product_id) = item.product_id else {
            continue;
        };
        Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(item.quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::TrackInventory.eq(true))
            .exec(conn)
            .await
            .map_err(RepositoryError::database_error)?;
    }
    Ok(())
}

fn validate_checkout(input: &CheckoutInput) -> Result<(), RepositoryError> {
    if !crate::validation::is_valid_email(input.customer_email.trim()) {
        return Err(RepositoryError::validation_error("Invalid email address"));
    }
    if !input.shipping_address.is_object() {
        return Err(RepositoryError::validation_error(
            "Shipping address is required",
        ));
    }
    if input
        .billing_address
        .as_ref()
        .is_some_and(|address| !address.is_object())
    {
        return Err(RepositoryError::validation_error(
            "Billing address must be an object",
        ));
    }
    if input
        .customer_notes
        .as_deref()
        .is_some_and(|notes| notes.chars().count() > ORDER_NOTES_MAX_LENGTH)
    {
        return Err(RepositoryError::validation_error(
            "Order notes must be less than 500 characters",
        ));
    }
    Ok(())
}
