//! Driving port for subscription lifecycle operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    BillingInterval, CustomerId, Error, Money, Subscription, SubscriptionId, TenantContext,
};

/// Start a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    /// Subscribing customer.
    pub customer_id: CustomerId,
    /// Plan name.
    pub plan: String,
    /// Price per period.
    pub price: Money,
    /// Billing interval.
    pub interval: BillingInterval,
    /// Free trial length; zero starts billing immediately.
    pub trial_days: u32,
}

/// Result of recording a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewalOutcome {
    /// Subscription after the renewal.
    pub subscription: Subscription,
    /// Amount charged, absent when the subscription ended instead.
    pub charged: Option<Money>,
}

/// Subscription operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionCommand: Send + Sync {
    /// Start a subscription.
    async fn create(
        &self,
        ctx: &TenantContext,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription, Error>;

    /// Read a subscription.
    async fn get(&self, ctx: &TenantContext, id: SubscriptionId) -> Result<Subscription, Error>;

    /// Record a successful charge for the due period.
    async fn renew(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<RenewalOutcome, Error>;

    /// Record a failed charge.
    async fn record_payment_failure(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<Subscription, Error>;

    /// Suspend billing.
    async fn pause(&self, ctx: &TenantContext, id: SubscriptionId) -> Result<Subscription, Error>;

    /// Resume billing.
    async fn resume(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<Subscription, Error>;

    /// Cancel immediately or at the end of the current period.
    async fn cancel(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
        at_period_end: bool,
    ) -> Result<Subscription, Error>;

    /// Forecast the next billing dates.
    async fn upcoming_billing_dates(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, Error>;
}
