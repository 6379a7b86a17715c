//! Pricing, inventory and plan rules used by the cart, checkout and catalog
//! handlers.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use utoipa::ToSchema;

use crate::validation::{
    PRODUCT_DESCRIPTION_MAX_LENGTH, PRODUCT_NAME_MAX_LENGTH, PRODUCT_NAME_MIN_LENGTH,
    PRODUCT_PRICE_MAX, PRODUCT_SKU_MAX_LENGTH,
};

pub const ORDER_NUMBER_PREFIX: &str = "ORD";
pub const PRODUCT_SKU_PREFIX: &str = "PROD";
/// Percent applied when a store has not configured its own rate.
pub const DEFAULT_TAX_RATE_PERCENT: f64 = 10.0;
pub const DEFAULT_SHIPPING_COST: f64 = 0.0;
pub const FREE_SHIPPING_THRESHOLD: f64 = 50.0;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Subscription plan and the resource limits it grants. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub monthly_price: f64,
    pub max_products: i32,
    pub max_customers: i32,
    pub max_storage_mb: i32,
    pub max_orders: i32,
}

pub const SUBSCRIPTION_PLANS: &[SubscriptionPlan] = &[
    SubscriptionPlan {
        id: "free",
        name: "Free",
        monthly_price: 0.0,
        max_products: 10,
        max_customers: 100,
        max_storage_mb: 100,
        max_orders: 50,
    },
    SubscriptionPlan {
        id: "starter",
        name: "Starter",
        monthly_price: 29.0,
        max_products: 100,
        max_customers: 1000,
        max_storage_mb: 1024,
        max_orders: 500,
    },
    SubscriptionPlan {
        id: "professional",
        name: "Professional",
        monthly_price: 99.0,
        max_products: -1,
        max_customers: -1,
        max_storage_mb: 10240,
        max_orders: -1,
    },
];

pub fn subscription_plan(id: &str) -> Option<&'static SubscriptionPlan> {
    SUBSCRIPTION_PLANS.iter().find(|plan| plan.id == id)
}

/// A priced quantity of something, as held in a cart or an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineItem {
    pub unit_price: f64,
    pub quantity: i32,
}

/// Breakdown produced at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub shipping: f64,
    pub discount: f64,
    pub total: f64,
}

/// Per-unit rates for weight and distance based shipping quotes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingRates {
    pub base: f64,
    pub per_kg: f64,
    pub per_km: f64,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            base: 5.99,
            per_kg: 0.5,
            per_km: 0.1,
        }
    }
}

/// Availability bucket shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    LimitedStock,
    InStock,
}

impl StockStatus {
    pub fn label(self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "Out of Stock",
            StockStatus::LowStock => "Low Stock",
            StockStatus::LimitedStock => "Limited Stock",
            StockStatus::InStock => "In Stock",
        }
    }
}

/// `ORD-<last 6 digits of the epoch millis>-<6 random alphanumerics>`
pub fn generate_order_number() -> String {
    format!(
        "{ORDER_NUMBER_PREFIX}-{}-{}",
        timestamp_suffix(6),
        random_code(6)
    )
}

/// `<prefix>-<last 4 digits of the epoch millis>-<4 random alphanumerics>`
pub fn generate_product_sku(prefix: &str) -> String {
    format!("{prefix}-{}-{}", timestamp_suffix(4), random_code(4))
}

pub fn calculate_cart_total(items: &[LineItem]) -> f64 {
    items
        .iter()
        .map(|item| item.unit_price * f64::from(item.quantity))
        .sum()
}

/// `rate_percent` is a percentage, e.g. `8.25`.
pub fn calculate_tax(subtotal: f64, rate_percent: f64) -> f64 {
    subtotal * (rate_percent / 100.0)
}

pub fn calculate_shipping_cost(weight_kg: f64, distance_km: f64, rates: ShippingRates) -> f64 {
    rates.base + weight_kg * rates.per_kg + distance_km * rates.per_km
}

pub fn calculate_discount(subtotal: f64, discount_percent: f64) -> f64 {
    subtotal * (discount_percent / 100.0)
}

/// The discount comes off the subtotal first; tax is charged on the discounted amount.
pub fn calculate_final_total(
    subtotal: f64,
    tax_rate_percent: f64,
    shipping: f64,
    discount_percent: f64,
) -> OrderTotals {
    let discount = calculate_discount(subtotal, discount_percent);
    let discounted = subtotal - discount;
    let tax = calculate_tax(discounted, tax_rate_percent);

    OrderTotals {
        subtotal,
        tax,
        shipping,
        discount,
        total: discounted + tax + shipping,
    }
}

impl OrderTotals {
    /// Rounds every component to whole cents for persistence.
    pub fn rounded(self) -> Self {
        Self {
            subtotal: round_currency(self.subtotal),
            tax: round_currency(self.tax),
            shipping: round_currency(self.shipping),
            discount: round_currency(self.discount),
            total: round_currency(self.total),
        }
    }
}

pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

pub fn is_in_stock(quantity: i32, reserved: i32) -> bool {
    quantity - reserved > 0
}

pub fn stock_status(quantity: i32, reserved: i32) -> StockStatus {
    match quantity - reserved {
        available if available <= 0 => StockStatus::OutOfStock,
        available if available <= 5 => StockStatus::LowStock,
        available if available <= 20 => StockStatus::LimitedStock,
        _ => StockStatus::InStock,
    }
}

/// Mean rating rounded to one decimal; zero when there are no ratings.
pub fn calculate_average_rating(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub fn format_rating(rating: f64) -> String {
    format!("{rating:.1}/5.0")
}

/// Margin as a percentage of the selling price.
pub fn calculate_profit_margin(cost: f64, selling_price: f64) -> f64 {
    if selling_price == 0.0 {
        return 0.0;
    }
    (selling_price - cost) / selling_price * 100.0
}

/// Markup as a percentage of cost.
pub fn calculate_markup(cost: f64, selling_price: f64) -> f64 {
    if cost == 0.0 {
        return 0.0;
    }
    (selling_price - cost) / cost * 100.0
}

/// Catalog fields subject to content rules.
#[derive(Debug, Clone, Copy)]
pub struct ProductDraft<'a> {
    pub name: &'a str,
    pub price: f64,
    pub description: Option<&'a str>,
    pub sku: Option<&'a str>,
}

/// Returns every rule the draft violates, in a fixed order.
pub fn validate_product_data(draft: &ProductDraft<'_>) -> Vec<String> {
    let mut errors = Vec::new();
    let name_length = draft.name.trim().chars().count();

    if name_length < PRODUCT_NAME_MIN_LENGTH {
        errors.push("Product name must be at least 3 characters long".to_string());
    } else if name_length > PRODUCT_NAME_MAX_LENGTH {
        errors.push("Product name must be less than 100 characters".to_string());
    }

    if !(draft.price > 0.0) {
        errors.push("Product price must be greater than 0".to_string());
    } else if draft.price > PRODUCT_PRICE_MAX {
        errors.push("Product price cannot exceed $999,999.99".to_string());
    }

    if let Some(description) = draft.description {
        let length = description.trim().chars().count();
        if length < 10 {
            errors.push("Product description must be at least 10 characters long".to_string());
        } else if length > PRODUCT_DESCRIPTION_MAX_LENGTH {
            errors.push("Product description must be less than 2000 characters".to_string());
        }
    }

    if let Some(sku) = draft.sku
        && sku.chars().count() > PRODUCT_SKU_MAX_LENGTH
    {
        errors.push(format!(
            "SKU must be at most {PRODUCT_SKU_MAX_LENGTH} characters"
        ));
    }

    errors
}

pub fn calculate_estimated_delivery(
    order_date: DateTime<Utc>,
    processing_days: i64,
    shipping_days: i64,
) -> DateTime<Utc> {
    order_date + Duration::days(processing_days + shipping_days)
}

pub fn qualifies_for_free_shipping(subtotal: f64, threshold: f64) -> bool {
    subtotal >= threshold
}

fn timestamp_suffix(digits: usize) -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let start = millis.len().saturating_sub(digits);
    millis[start..].to_string()
}

fn random_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_order_number_shape() {
        let number = generate_order_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 6);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_product_sku_shape() {
        let sku = generate_product_sku(PRODUCT_SKU_PREFIX);
        assert!(sku.starts_with("PROD-"));
        assert_eq!(sku.len(), "PROD-1234-ABCD".len());
    }

    #[test]
    fn test_cart_total_and_tax() {
        let items = [
            LineItem {
                unit_price: 99.99,
                quantity: 1,
            },
            LineItem {
                unit_price: 19.99,
                quantity: 2,
            },
        ];
        assert_close(calculate_cart_total(&items), 139.97);
        assert_close(calculate_cart_total(&[]), 0.0);
        assert_close(calculate_tax(200.0, 10.0), 20.0);
    }

    #[test]
    fn test_shipping_cost() {
        assert_close(
            calculate_shipping_cost(2.0, 10.0, ShippingRates::default()),
            5.99 + 1.0 + 1.0,
        );
    }

    #[test]
    fn test_final_total_applies_discount_before_tax() {
        let totals = calculate_final_total(100.0, 10.0, 5.0, 20.0);
        assert_close(totals.discount, 20.0);
        assert_close(totals.tax, 8.0);
        assert_close(totals.shipping, 5.0);
        assert_close(totals.total, 93.0);
        assert_close(totals.subtotal, 100.0);
    }

    #[test]
    fn test_rounded_totals() {
        let totals = calculate_final_total(33.333, 7.25, 0.0, 0.0).rounded();
        assert_close(totals.subtotal, 33.33);
        assert_close(totals.tax, 2.42);
        assert_close(totals.total, 35.75);
    }

    #[test]
    fn test_stock_status_buckets() {
        assert_eq!(stock_status(0, 0), StockStatus::OutOfStock);
        assert_eq!(stock_status(10, 10), StockStatus::OutOfStock);
        assert_eq!(stock_status(5, 0), StockStatus::LowStock);
        assert_eq!(stock_status(20, 0), StockStatus::LimitedStock);
        assert_eq!(stock_status(21, 0), StockStatus::InStock);
        assert_eq!(StockStatus::LowStock.label(), "Low Stock");
        assert!(is_in_stock(3, 2));
        assert!(!is_in_stock(2, 2));
    }

    #[test]
    fn test_rating_helpers() {
        assert_close(calculate_average_rating(&[]), 0.0);
        assert_close(calculate_average_rating(&[4.0, 5.0, 4.0]), 4.3);
        assert_eq!(format_rating(4.27), "4.3/5.0");
    }

    #[test]
    fn test_margin_and_markup() {
        assert_close(calculate_profit_margin(60.0, 100.0), 40.0);
        assert_close(calculate_profit_margin(60.0, 0.0), 0.0);
        assert_close(calculate_markup(50.0, 100.0), 100.0);
        assert_close(calculate_markup(0.0, 100.0), 0.0);
    }

    #[test]
    fn test_validate_product_data() {
        let valid = ProductDraft {
            name: "Wireless Headphones",
            price: 99.99,
            description: Some("High-quality wireless headphones"),
            sku: Some("WH-001"),
        };
        assert!(validate_product_data(&valid).is_empty());

        let invalid = ProductDraft {
            name: "TV",
            price: 0.0,
            description: Some("short"),
            sku: None,
        };
        assert_eq!(
            validate_product_data(&invalid),
            vec![
                "Product name must be at least 3 characters long",
                "Product price must be greater than 0",
                "Product description must be at least 10 characters long",
            ]
        );

        let too_expensive = ProductDraft {
            price: 1_000_000.0,
            ..valid
        };
        assert_eq!(
            validate_product_data(&too_expensive),
            vec!["Product price cannot exceed $999,999.99"]
        );
    }

    #[test]
    fn test_delivery_and_free_shipping() {
        let ordered = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert_eq!(calculate_estimated_delivery(ordered, 1, 3), expected);
        assert!(qualifies_for_free_shipping(50.0, FREE_SHIPPING_THRESHOLD));
        assert!(!qualifies_for_free_shipping(49.99, FREE_SHIPPING_THRESHOLD));
    }

    #[test]
    fn test_subscription_plans() {
        let professional = subscription_plan("professional").unwrap();
        assert_eq!(professional.max_products, -1);
        assert_eq!(subscription_plan("free").unwrap().max_products, 10);
        assert!(subscription_plan("enterprise").is_none());
    }
}
