//! Driving port for loyalty accounts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    CurrencyCode, CustomerId, EarnOutcome, Error, LoyaltyAccount, LoyaltyTier, Money, OrderId,
    ReverseOutcome, TenantContext,
};

/// Award points for a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnPointsRequest {
    /// Customer earning the points.
    pub customer_id: CustomerId,
    /// Order the points are awarded for.
    pub order_id: OrderId,
    /// Amount paid for the order.
    pub order_total: Money,
}

/// Spend points on a discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemPointsRequest {
    /// Customer spending the points.
    pub customer_id: CustomerId,
    /// Points to spend.
    pub points: u64,
    /// Currency of the resulting discount.
    pub currency: CurrencyCode,
}

/// Discount produced by a redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemOutcome {
    /// Discount to apply at checkout.
    pub discount: Money,
    /// Balance left after the redemption.
    pub balance: u64,
}

/// Manual correction of a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPointsRequest {
    /// Customer whose balance changes.
    pub customer_id: CustomerId,
    /// Signed change.
    pub delta: i64,
    /// Why the correction was made.
    pub reason: String,
}

/// Withdraw the points of a refunded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseOrderPointsRequest {
    /// Customer who earned the points.
    pub customer_id: CustomerId,
    /// Refunded order.
    pub order_id: OrderId,
}

/// An account together with its progress toward the next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccountView {
    /// Account state and ledger.
    pub account: LoyaltyAccount,
    /// Tier above the current one.
    pub next_tier: Option<LoyaltyTier>,
    /// Lifetime points still needed for [`Self::next_tier`].
    pub points_to_next_tier: Option<u64>,
}

/// Loyalty operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyCommand: Send + Sync {
    /// Read an account; customers without one see an empty bronze account.
    async fn get_account(
        &self,
        ctx: &TenantContext,
        customer_id: CustomerId,
    ) -> Result<LoyaltyAccountView, Error>;

    /// Award points for an order.
    async fn earn(
        &self,
        ctx: &TenantContext,
        request: EarnPointsRequest,
    ) -> Result<EarnOutcome, Error>;

    /// Spend points.
    async fn redeem(
        &self,
        ctx: &TenantContext,
        request: RedeemPointsRequest,
    ) -> Result<RedeemOutcome, Error>;

    /// Correct a balance by hand.
    async fn adjust(
        &self,
        ctx: &TenantContext,
        request: AdjustPointsRequest,
    ) -> Result<LoyaltyAccountView, Error>;

    /// Undo the award of a refunded order.
    async fn reverse_order(
        &self,
        ctx: &TenantContext,
        request: ReverseOrderPointsRequest,
    ) -> Result<ReverseOutcome, Error>;
}
