//! Outbound customer notifications.
//!
//! Delivery (e-mail, SMS) is pluggable; the default implementation only logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::order;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// A password reset token was issued for `email`.
    async fn password_reset_requested(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    async fn order_placed(&self, order: &order::Model) -> anyhow::Result<()>;
}

/// Writes notifications to the tracing pipeline instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn password_reset_requested(
        &self,
        email: &str,
        _token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        tracing::info!(
            email = %email,
            expires_at = %expires_at,
            "Password reset token issued; no mail transport configured"
        );
        Ok(())
    }

    async fn order_placed(&self, order: &order::Model) -> anyhow::Result<()> {
        tracing::info!(
            order_number = %order.order_number,
            customer_email = %order.customer_email,
            total = order.total,
            "Order confirmation queued"
        );
        Ok(())
    }
}
