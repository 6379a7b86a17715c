//! Sales analytics: ratio metrics, trends and time series used by the tenant
//! dashboard.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::formatting;
use crate::models::OrderStatus;

pub fn calculate_conversion_rate(conversions: u64, visitors: u64) -> f64 {
    percentage_of(conversions as f64, visitors as f64)
}

pub fn calculate_average_order_value(revenue: f64, orders: u64) -> f64 {
    if orders == 0 {
        return 0.0;
    }
    revenue / orders as f64
}

pub fn calculate_customer_lifetime_value(
    average_order_value: f64,
    orders_per_customer: f64,
    lifespan: f64,
) -> f64 {
    average_order_value * orders_per_customer * lifespan
}

/// Period over period change in percent; zero when there is no baseline.
pub fn calculate_growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

pub fn calculate_retention_rate(retained: u64, total: u64) -> f64 {
    percentage_of(retained as f64, total as f64)
}

pub fn calculate_cart_abandonment_rate(abandoned: u64, total: u64) -> f64 {
    percentage_of(abandoned as f64, total as f64)
}

fn percentage_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part * 100.0 / whole
}

/// Raw period totals fed into [`generate_report`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReportInput {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub total_visitors: u64,
    pub conversions: u64,
    pub previous_revenue: f64,
    pub previous_orders: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsReport {
    pub average_order_value: f64,
    pub conversion_rate: f64,
    pub revenue_growth: f64,
    pub order_growth: f64,
}

pub fn generate_report(input: &ReportInput) -> AnalyticsReport {
    AnalyticsReport {
        average_order_value: calculate_average_order_value(
            input.total_revenue,
            input.total_orders,
        ),
        conversion_rate: calculate_conversion_rate(input.conversions, input.total_visitors),
        revenue_growth: calculate_growth_rate(input.total_revenue, input.previous_revenue),
        order_growth: calculate_growth_rate(
            input.total_orders as f64,
            input.previous_orders as f64,
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendIndicator {
    pub direction: TrendDirection,
    /// Absolute change in percent
    pub percentage: f64,
}

pub fn trend_indicator(current: f64, previous: f64) -> TrendIndicator {
    let stable = TrendIndicator {
        direction: TrendDirection::Stable,
        percentage: 0.0,
    };
    if previous == 0.0 {
        return stable;
    }

    let change = (current - previous) / previous * 100.0;
    if change > 0.0 {
        TrendIndicator {
            direction: TrendDirection::Up,
            percentage: change.abs(),
        }
    } else if change < 0.0 {
        TrendIndicator {
            direction: TrendDirection::Down,
            percentage: change.abs(),
        }
    } else {
        stable
    }
}

/// Trailing averages over `period` values; empty when there are fewer values than the window.
pub fn moving_average(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SeriesPeriod {
    #[default]
    Day,
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeSeriesPoint {
    /// `YYYY-MM-DD` for day and week buckets, `YYYY-MM` for months
    pub date: String,
    pub value: f64,
}

/// Buckets points by period and averages each bucket. Weeks start on Sunday.
/// Output is sorted by bucket key.
pub fn generate_time_series(
    points: &[(NaiveDate, f64)],
    period: SeriesPeriod,
) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<String, (f64, usize)> = BTreeMap::new();

    for (date, value) in points {
        let key = match period {
            SeriesPeriod::Day => date.format("%Y-%m-%d").to_string(),
            SeriesPeriod::Week => {
                let offset = i64::from(date.weekday().num_days_from_sunday());
                (*date - Duration::days(offset))
                    .format("%Y-%m-%d")
                    .to_string()
            }
            SeriesPeriod::Month => format!("{}-{:02}", date.year(), date.month()),
        };
        let bucket = buckets.entry(key).or_insert((0.0, 0));
        bucket.0 += value;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(date, (sum, count))| TimeSeriesPoint {
            date,
            value: sum / count as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Currency,
    Percentage,
    Number,
    Decimal,
}

pub fn format_metric(value: f64, kind: MetricKind) -> String {
    match kind {
        MetricKind::Currency => formatting::format_price(value, formatting::DEFAULT_CURRENCY),
        MetricKind::Percentage => format!("{value:.2}%"),
        MetricKind::Decimal => format!("{value:.2}"),
        MetricKind::Number => formatting::format_number(value.round()),
    }
}

/// The slice of an order the dashboard needs.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFact {
    pub created_at: DateTime<Utc>,
    pub total: f64,
    pub customer_email: String,
    pub status: OrderStatus,
}

/// Tenant dashboard figures for one period compared with the period before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesSummary {
    pub revenue: f64,
    pub formatted_revenue: String,
    pub orders: u64,
    pub customers: u64,
    pub average_order_value: f64,
    pub revenue_growth: f64,
    pub order_growth: f64,
    pub revenue_trend: TrendIndicator,
    /// Share of the previous period's customers who ordered again
    pub customer_retention_rate: f64,
    pub cart_abandonment_rate: f64,
    pub orders_by_status: BTreeMap<String, u64>,
    pub daily_revenue: Vec<TimeSeriesPoint>,
}

/// Cancelled and refunded orders are counted by status but excluded from revenue.
pub fn summarize_sales(
    current: &[OrderFact],
    previous: &[OrderFact],
    open_carts: u64,
    currency: &str,
) -> SalesSummary {
    let revenue = realized_revenue(current);
    let previous_revenue = realized_revenue(previous);
    let orders = current.iter().filter(|o| !o.status.is_void()).count() as u64;
    let previous_orders = previous.iter().filter(|o| !o.status.is_void()).count() as u64;

    let customers: HashSet<&str> = current
        .iter()
        .map(|order| order.customer_email.as_str())
        .collect();
    let previous_customers: HashSet<&str> = previous
        .iter()
        .map(|order| order.customer_email.as_str())
        .collect();
    let retained = previous_customers.intersection(&customers).count() as u64;

    let mut orders_by_status = BTreeMap::new();
    for order in current {
        *orders_by_status
            .entry(order.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for order in current.iter().filter(|o| !o.status.is_void()) {
        *per_day.entry(order.created_at.date_naive()).or_insert(0.0) += order.total;
    }
    let daily_points: Vec<(NaiveDate, f64)> = per_day.into_iter().collect();

    let report = generate_report(&ReportInput {
        total_revenue: revenue,
        total_orders: orders,
        previous_revenue,
        previous_orders,
        ..ReportInput::default()
    });

    SalesSummary {
        revenue,
        formatted_revenue: formatting::format_price(revenue, currency),
        orders,
        customers: customers.len() as u64,
        average_order_value: report.average_order_value,
        revenue_growth: report.revenue_growth,
        order_growth: report.order_growth,
        revenue_trend: trend_indicator(revenue, previous_revenue),
        customer_retention_rate: calculate_retention_rate(
            retained,
            previous_customers.len() as u64,
        ),
        cart_abandonment_rate: calculate_cart_abandonment_rate(open_carts, open_carts + orders),
        orders_by_status,
        daily_revenue: generate_time_series(&daily_points, SeriesPeriod::Day),
    }
}

fn realized_revenue(orders: &[OrderFact]) -> f64 {
    orders
        .iter()
        .filter(|order| !order.status.is_void())
        .map(|order| order.total)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fact(day: u32, total: f64, email: &str, status: OrderStatus) -> OrderFact {
        OrderFact {
            created_at: Utc.with_ymd_and_hms(2024, 5, day, 10, 0, 0).unwrap(),
            total,
            customer_email: email.to_string(),
            status,
        }
    }

    #[test]
    fn test_ratios_guard_zero_denominators() {
        assert_eq!(calculate_conversion_rate(5, 0), 0.0);
        assert_eq!(calculate_average_order_value(100.0, 0), 0.0);
        assert_eq!(calculate_growth_rate(100.0, 0.0), 0.0);
        assert_eq!(calculate_retention_rate(1, 0), 0.0);
        assert_eq!(calculate_cart_abandonment_rate(3, 0), 0.0);
    }

    #[test]
    fn test_ratios() {
        assert_eq!(calculate_conversion_rate(25, 1000), 2.5);
        assert_eq!(calculate_average_order_value(300.0, 4), 75.0);
        assert_eq!(calculate_customer_lifetime_value(50.0, 3.0, 2.0), 300.0);
        assert_eq!(calculate_growth_rate(150.0, 100.0), 50.0);
        assert_eq!(calculate_growth_rate(50.0, 100.0), -50.0);
        assert_eq!(calculate_cart_abandonment_rate(7, 10), 70.0);
    }

    #[test]
    fn test_generate_report() {
        let report = generate_report(&ReportInput {
            total_revenue: 1200.0,
            total_orders: 12,
            total_visitors: 400,
            conversions: 12,
            previous_revenue: 1000.0,
            previous_orders: 10,
        });
        assert_eq!(report.average_order_value, 100.0);
        assert_eq!(report.conversion_rate, 3.0);
        assert!((report.revenue_growth - 20.0).abs() < 1e-9);
        assert!((report.order_growth - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_indicator() {
        let up = trend_indicator(120.0, 100.0);
        assert_eq!(up.direction, TrendDirection::Up);
        assert!((up.percentage - 20.0).abs() < 1e-9);

        let down = trend_indicator(80.0, 100.0);
        assert_eq!(down.direction, TrendDirection::Down);
        assert!((down.percentage - 20.0).abs() < 1e-9);

        assert_eq!(
            trend_indicator(100.0, 100.0).direction,
            TrendDirection::Stable
        );
        assert_eq!(trend_indicator(10.0, 0.0).direction, TrendDirection::Stable);
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(
            moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3),
            vec![2.0, 3.0, 4.0]
        );
        assert!(moving_average(&[1.0, 2.0], 3).is_empty());
        assert!(moving_average(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_time_series_by_day_averages_and_sorts() {
        let series = generate_time_series(
            &[
                (date(2024, 5, 2), 30.0),
                (date(2024, 5, 1), 10.0),
                (date(2024, 5, 1), 20.0),
            ],
            SeriesPeriod::Day,
        );
        assert_eq!(
            series,
            vec![
                TimeSeriesPoint {
                    date: "2024-05-01".to_string(),
                    value: 15.0
                },
                TimeSeriesPoint {
                    date: "2024-05-02".to_string(),
                    value: 30.0
                },
            ]
        );
    }

    #[test]
    fn test_time_series_week_starts_on_sunday() {
        // 2024-05-05 is a Sunday; the 8th is the following Wednesday.
        let series = generate_time_series(
            &[(date(2024, 5, 5), 4.0), (date(2024, 5, 8), 8.0)],
            SeriesPeriod::Week,
        );
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "2024-05-05");
        assert_eq!(series[0].value, 6.0);
    }

    #[test]
    fn test_time_series_by_month() {
        let series = generate_time_series(
            &[(date(2024, 1, 31), 1.0), (date(2024, 2, 1), 3.0)],
            SeriesPeriod::Month,
        );
        let keys: Vec<&str> = series.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02"]);
    }

    #[test]
    fn test_format_metric() {
        assert_eq!(format_metric(1234.5, MetricKind::Currency), "$1,234.50");
        assert_eq!(format_metric(12.346, MetricKind::Percentage), "12.35%");
        assert_eq!(format_metric(2.5, MetricKind::Decimal), "2.50");
        assert_eq!(format_metric(1234.6, MetricKind::Number), "1,235");
    }

    #[test]
    fn test_summarize_sales() {
        let current = vec![
            fact(1, 100.0, "a@example.com", OrderStatus::Delivered),
            fact(1, 50.0, "b@example.com", OrderStatus::Pending),
            fact(2, 30.0, "a@example.com", OrderStatus::Cancelled),
        ];
        let previous = vec![
            fact(1, 75.0, "a@example.com", OrderStatus::Delivered),
            fact(1, 25.0, "c@example.com", OrderStatus::Delivered),
        ];

        let summary = summarize_sales(&current, &previous, 2, "USD");

        assert_eq!(summary.revenue, 150.0);
        assert_eq!(summary.formatted_revenue, "$150.00");
        assert_eq!(summary.orders, 2);
        assert_eq!(summary.customers, 2);
        assert_eq!(summary.average_order_value, 75.0);
        assert_eq!(summary.revenue_growth, 50.0);
        assert_eq!(summary.revenue_trend.direction, TrendDirection::Up);
        assert_eq!(summary.customer_retention_rate, 50.0);
        assert_eq!(summary.cart_abandonment_rate, 50.0);
        assert_eq!(summary.orders_by_status.get("CANCELLED"), Some(&1));
        assert_eq!(summary.orders_by_status.get("DELIVERED"), Some(&1));
        assert_eq!(summary.daily_revenue.len(), 1);
        assert_eq!(summary.daily_revenue[0].value, 150.0);
    }
}
