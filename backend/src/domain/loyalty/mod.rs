//! Loyalty points, tiers, and the per-customer ledger.
//!
//! Points are earned on order totals at a tier-dependent multiplier, spent as
//! a fixed-value discount, and clawed back when an order is refunded. The tier
//! is always derived from lifetime points, never stored independently of them.

mod service;

pub use service::LoyaltyService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{BASIS_POINTS_SCALE, CurrencyCode, CustomerId, Error, Money, OrderId, Revisioned};

/// Customer standing derived from lifetime points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    /// Entry tier.
    Bronze,
    /// Second tier.
    Silver,
    /// Third tier.
    Gold,
    /// Highest tier.
    Platinum,
}

impl LoyaltyTier {
    /// Tiers in ascending order.
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    /// The tier above this one.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => None,
        }
    }

    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

/// One value per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable<T> {
    /// Value for [`LoyaltyTier::Bronze`].
    pub bronze: T,
    /// Value for [`LoyaltyTier::Silver`].
    pub silver: T,
    /// Value for [`LoyaltyTier::Gold`].
    pub gold: T,
    /// Value for [`LoyaltyTier::Platinum`].
    pub platinum: T,
}

impl<T: Copy> TierTable<T> {
    /// Value for `tier`.
    pub const fn get(&self, tier: LoyaltyTier) -> T {
        match tier {
            LoyaltyTier::Bronze => self.bronze,
            LoyaltyTier::Silver => self.silver,
            LoyaltyTier::Gold => self.gold,
            LoyaltyTier::Platinum => self.platinum,
        }
    }
}

/// Invalid loyalty policy values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoyaltyPolicyError {
    /// The bronze threshold must be zero so every account has a tier.
    #[error("bronze threshold must be 0, got {0}")]
    BronzeThresholdNotZero(u64),
    /// Thresholds must strictly increase from tier to tier.
    #[error("tier thresholds must strictly increase")]
    ThresholdsNotIncreasing,
    /// A rate that acts as a divisor or unit value is zero.
    #[error("{0} must be positive")]
    ZeroRate(&'static str),
}

/// Earn, redeem, and tier rules for an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyPolicy {
    thresholds: TierTable<u64>,
    multipliers_bps: TierTable<u32>,
    points_per_currency_unit: u64,
    minor_units_per_currency_unit: u64,
    minor_units_per_point: u64,
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        Self {
            thresholds: TierTable {
                bronze: 0,
                silver: 1_000,
                gold: 5_000,
                platinum: 20_000,
            },
            multipliers_bps: TierTable {
                bronze: 10_000,
                silver: 12_500,
                gold: 15_000,
                platinum: 20_000,
            },
            points_per_currency_unit: 1,
            minor_units_per_currency_unit: 100,
            minor_units_per_point: 1,
        }
    }
}

impl LoyaltyPolicy {
    /// Build a policy from tier thresholds and multipliers, keeping the
    /// default earn and redemption rates.
    pub fn new(
        thresholds: TierTable<u64>,
        multipliers_bps: TierTable<u32>,
    ) -> Result<Self, LoyaltyPolicyError> {
        if thresholds.bronze != 0 {
            return Err(LoyaltyPolicyError::BronzeThresholdNotZero(thresholds.bronze));
        }
        let increasing = thresholds.bronze < thresholds.silver
            && thresholds.silver < thresholds.gold
            && thresholds.gold < thresholds.platinum;
        if !increasing {
            return Err(LoyaltyPolicyError::ThresholdsNotIncreasing);
        }
        Ok(Self {
            thresholds,
            multipliers_bps,
            ..Self::default()
        })
    }

    /// Set how many points one whole currency unit earns.
    pub fn with_earn_rate(
        mut self,
        points_per_currency_unit: u64,
        minor_units_per_currency_unit: u64,
    ) -> Result<Self, LoyaltyPolicyError> {
        if minor_units_per_currency_unit == 0 {
            return Err(LoyaltyPolicyError::ZeroRate("minor units per currency unit"));
        }
        self.points_per_currency_unit = points_per_currency_unit;
        self.minor_units_per_currency_unit = minor_units_per_currency_unit;
        Ok(self)
    }

    /// Set the discount value of one point in minor units.
    pub fn with_point_value(
        mut self,
        minor_units_per_point: u64,
    ) -> Result<Self, LoyaltyPolicyError> {
        if minor_units_per_point == 0 {
            return Err(LoyaltyPolicyError::ZeroRate("minor units per point"));
        }
        self.minor_units_per_point = minor_units_per_point;
        Ok(self)
    }

    /// Lifetime points needed to reach `tier`.
    pub const fn threshold(&self, tier: LoyaltyTier) -> u64 {
        self.thresholds.get(tier)
    }

    /// Earn multiplier of `tier` in basis points.
    pub const fn multiplier_bps(&self, tier: LoyaltyTier) -> u32 {
        self.multipliers_bps.get(tier)
    }

    /// Earn multipliers for every tier.
    pub const fn multipliers(&self) -> TierTable<u32> {
        self.multipliers_bps
    }

    /// Minor units that make up one whole currency unit.
    pub const fn minor_units_per_currency_unit(&self) -> u64 {
        self.minor_units_per_currency_unit
    }

    /// Highest tier whose threshold does not exceed `lifetime_points`.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{LoyaltyPolicy, LoyaltyTier};
    ///
    /// let policy = LoyaltyPolicy::default();
    /// assert_eq!(policy.tier_for(999), LoyaltyTier::Bronze);
    /// assert_eq!(policy.tier_for(1_000), LoyaltyTier::Silver);
    /// assert_eq!(policy.tier_for(25_000), LoyaltyTier::Platinum);
    /// ```
    pub fn tier_for(&self, lifetime_points: u64) -> LoyaltyTier {
        LoyaltyTier::ALL
            .into_iter()
            .rev()
            .find(|tier| self.threshold(*tier) <= lifetime_points)
            .unwrap_or(LoyaltyTier::Bronze)
    }

    /// Points an order total earns at `tier`, rounding down at each step.
    pub fn points_for(&self, total: &Money, tier: LoyaltyTier) -> Result<u64, LoyaltyError> {
        let total_minor = u128::try_from(total.amount_minor())
            .map_err(|_| LoyaltyError::NonPositiveTotal)?;
        let base = total_minor
            .checked_mul(u128::from(self.points_per_currency_unit))
            .and_then(|scaled| scaled.checked_div(u128::from(self.minor_units_per_currency_unit)))
            .ok_or(LoyaltyError::Overflow)?;
        let boosted = base
            .checked_mul(u128::from(self.multiplier_bps(tier)))
            .and_then(|scaled| scaled.checked_div(u128::from(BASIS_POINTS_SCALE)))
            .ok_or(LoyaltyError::Overflow)?;
        u64::try_from(boosted).map_err(|_| LoyaltyError::Overflow)
    }

    /// Discount granted for redeeming `points`.
    pub fn discount_for(&self, points: u64, currency: CurrencyCode) -> Result<Money, LoyaltyError> {
        let minor = points
            .checked_mul(self.minor_units_per_point)
            .ok_or(LoyaltyError::Overflow)?;
        let minor = i64::try_from(minor).map_err(|_| LoyaltyError::Overflow)?;
        Ok(Money::new(minor, currency))
    }
}

/// Rule violations raised by account operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoyaltyError {
    /// Order totals must be positive to earn points.
    #[error("order total must be positive")]
    NonPositiveTotal,
    /// The order already earned points.
    #[error("order {0} has already earned points")]
    DuplicateEarn(OrderId),
    /// Redemption or adjustment amount is zero.
    #[error("points must be positive")]
    ZeroPoints,
    /// Not enough points to redeem or deduct.
    #[error("insufficient points: requested {requested}, balance {balance}")]
    InsufficientPoints {
        /// Points requested.
        requested: u64,
        /// Points available.
        balance: u64,
    },
    /// Manual adjustments must say why.
    #[error("adjustment reason must not be empty")]
    EmptyReason,
    /// No earn entry exists for the order.
    #[error("order {0} has not earned points")]
    NoEarnForOrder(OrderId),
    /// The order's points were already reversed.
    #[error("points for order {0} were already reversed")]
    AlreadyReversed(OrderId),
    /// Point arithmetic overflowed.
    #[error("point arithmetic overflowed")]
    Overflow,
}

impl From<LoyaltyError> for Error {
    fn from(error: LoyaltyError) -> Self {
        let message = error.to_string();
        match error {
            LoyaltyError::DuplicateEarn(order_id) | LoyaltyError::AlreadyReversed(order_id) => {
                Self::conflict(message).with_details(json!({ "orderId": order_id }))
            }
            LoyaltyError::NoEarnForOrder(order_id) => {
                Self::not_found(message).with_details(json!({ "orderId": order_id }))
            }
            LoyaltyError::InsufficientPoints { requested, balance } => {
                Self::invalid_request(message).with_details(json!({
                    "code": "insufficient_points",
                    "requested": requested,
                    "balance": balance,
                }))
            }
            LoyaltyError::Overflow => Self::internal(message),
            LoyaltyError::NonPositiveTotal
            | LoyaltyError::ZeroPoints
            | LoyaltyError::EmptyReason => Self::invalid_request(message),
        }
    }
}

/// Kind of ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Points awarded for an order.
    Earn,
    /// Points spent on a discount.
    Redeem,
    /// Manual correction.
    Adjust,
    /// Earned points withdrawn after a refund.
    Reverse,
}

/// One movement of points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Movement kind.
    pub kind: LedgerKind,
    /// Signed change to the balance.
    pub points: i64,
    /// Order the movement relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    /// Free-text reason for adjustments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the movement happened.
    pub recorded_at: DateTime<Utc>,
}

/// Result of awarding points for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnOutcome {
    /// Points awarded.
    pub points: u64,
    /// Balance after the award.
    pub balance: u64,
    /// Tier before the award.
    pub previous_tier: LoyaltyTier,
    /// Tier after the award.
    pub tier: LoyaltyTier,
}

impl EarnOutcome {
    /// Whether the award moved the customer to another tier.
    pub fn tier_changed(&self) -> bool {
        self.previous_tier != self.tier
    }
}

/// Result of reversing an order's points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseOutcome {
    /// Points removed from the balance.
    pub points_removed: u64,
    /// Balance after the reversal.
    pub balance: u64,
    /// Tier before the reversal.
    pub previous_tier: LoyaltyTier,
    /// Tier after the reversal.
    pub tier: LoyaltyTier,
}

/// A customer's points position and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccount {
    customer_id: CustomerId,
    balance: u64,
    lifetime_points: u64,
    tier: LoyaltyTier,
    ledger: Vec<LedgerEntry>,
    #[serde(default)]
    revision: u32,
}

fn signed(points: u64) -> Result<i64, LoyaltyError> {
    i64::try_from(points).map_err(|_| LoyaltyError::Overflow)
}

impl Revisioned for LoyaltyAccount {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl LoyaltyAccount {
    /// Fresh bronze account with no points.
    pub const fn new(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            balance: 0,
            lifetime_points: 0,
            tier: LoyaltyTier::Bronze,
            ledger: Vec::new(),
            revision: 0,
        }
    }

    /// Owning customer.
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Spendable points.
    pub const fn balance(&self) -> u64 {
        self.balance
    }

    /// Points ever earned, net of reversals.
    pub const fn lifetime_points(&self) -> u64 {
        self.lifetime_points
    }

    /// Current tier.
    pub const fn tier(&self) -> LoyaltyTier {
        self.tier
    }

    /// Movements in the order they happened.
    pub fn ledger(&self) -> &[LedgerEntry] {
        self.ledger.as_slice()
    }

    /// Lifetime points still needed for the next tier; `None` at the top.
    pub fn points_to_next_tier(&self, policy: &LoyaltyPolicy) -> Option<u64> {
        self.tier
            .next()
            .map(|next| policy.threshold(next).saturating_sub(self.lifetime_points))
    }

    fn earned_for(&self, order_id: OrderId) -> Option<u64> {
        self.ledger
            .iter()
            .find(|entry| entry.kind == LedgerKind::Earn && entry.order_id == Some(order_id))
            .and_then(|entry| u64::try_from(entry.points).ok())
    }

    fn has_entry(&self, kind: LedgerKind, order_id: OrderId) -> bool {
        self.ledger
            .iter()
            .any(|entry| entry.kind == kind && entry.order_id == Some(order_id))
    }

    fn push(
        &mut self,
        kind: LedgerKind,
        points: i64,
        order_id: Option<OrderId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.ledger.push(LedgerEntry {
            kind,
            points,
            order_id,
            reason,
            recorded_at: now,
        });
    }

    /// Award points for a paid order at the customer's current tier.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use storefront::domain::{CustomerId, LoyaltyAccount, LoyaltyPolicy, Money, OrderId};
    ///
    /// let policy = LoyaltyPolicy::default();
    /// let mut account = LoyaltyAccount::new(CustomerId::random());
    /// let total = Money::parse(12_345, "USD").expect("valid");
    /// let outcome = account
    ///     .earn(&policy, OrderId::random(), total, Utc::now())
    ///     .expect("earn");
    /// assert_eq!(outcome.points, 123);
    /// ```
    pub fn earn(
        &mut self,
        policy: &LoyaltyPolicy,
        order_id: OrderId,
        total: Money,
        now: DateTime<Utc>,
    ) -> Result<EarnOutcome, LoyaltyError> {
        if !total.is_positive() {
            return Err(LoyaltyError::NonPositiveTotal);
        }
        if self.has_entry(LedgerKind::Earn, order_id) {
            return Err(LoyaltyError::DuplicateEarn(order_id));
        }
        let previous_tier = self.tier;
        let points = policy.points_for(&total, previous_tier)?;
        let balance = self.balance.checked_add(points).ok_or(LoyaltyError::Overflow)?;
        let lifetime = self
            .lifetime_points
            .checked_add(points)
            .ok_or(LoyaltyError::Overflow)?;
        let entry_points = signed(points)?;

        self.balance = balance;
        self.lifetime_points = lifetime;
        self.tier = policy.tier_for(lifetime);
        self.push(LedgerKind::Earn, entry_points, Some(order_id), None, now);

        Ok(EarnOutcome {
            points,
            balance,
            previous_tier,
            tier: self.tier,
        })
    }

    /// Spend points and return the discount they buy.
    pub fn redeem(
        &mut self,
        policy: &LoyaltyPolicy,
        points: u64,
        currency: CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<Money, LoyaltyError> {
        if points == 0 {
            return Err(LoyaltyError::ZeroPoints);
        }
        if points > self.balance {
            return Err(LoyaltyError::InsufficientPoints {
                requested: points,
                balance: self.balance,
            });
        }
        let discount = policy.discount_for(points, currency)?;
        let entry_points = signed(points)?
            .checked_neg()
            .ok_or(LoyaltyError::Overflow)?;
        self.balance = self.balance.saturating_sub(points);
        self.push(LedgerKind::Redeem, entry_points, None, None, now);
        Ok(discount)
    }

    /// Apply a manual correction. Positive deltas count toward lifetime
    /// points; negative deltas only reduce the balance.
    pub fn adjust(
        &mut self,
        policy: &LoyaltyPolicy,
        delta: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LoyaltyError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LoyaltyError::EmptyReason);
        }
        if delta == 0 {
            return Err(LoyaltyError::ZeroPoints);
        }
        let magnitude = delta.unsigned_abs();
        if delta > 0 {
            self.balance = self
                .balance
                .checked_add(magnitude)
                .ok_or(LoyaltyError::Overflow)?;
            self.lifetime_points = self
                .lifetime_points
                .checked_add(magnitude)
                .ok_or(LoyaltyError::Overflow)?;
            self.tier = policy.tier_for(self.lifetime_points);
        } else {
            if magnitude > self.balance {
                return Err(LoyaltyError::InsufficientPoints {
                    requested: magnitude,
                    balance: self.balance,
                });
            }
            self.balance = self.balance.saturating_sub(magnitude);
        }
        self.push(LedgerKind::Adjust, delta, None, Some(reason.to_owned()), now);
        Ok(())
    }

    /// Withdraw the points an order earned, as far as the balance allows.
    pub fn reverse_order(
        &mut self,
        policy: &LoyaltyPolicy,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<ReverseOutcome, LoyaltyError> {
        let earned = self
            .earned_for(order_id)
            .ok_or(LoyaltyError::NoEarnForOrder(order_id))?;
        if self.has_entry(LedgerKind::Reverse, order_id) {
            return Err(LoyaltyError::AlreadyReversed(order_id));
        }
        let previous_tier = self.tier;
        let removed = earned.min(self.balance);
        let entry_points = signed(removed)?
            .checked_neg()
            .ok_or(LoyaltyError::Overflow)?;

        self.balance = self.balance.saturating_sub(removed);
        self.lifetime_points = self.lifetime_points.saturating_sub(earned);
        self.tier = policy.tier_for(self.lifetime_points);
        self.push(LedgerKind::Reverse, entry_points, Some(order_id), None, now);

        Ok(ReverseOutcome {
            points_removed: removed,
            balance: self.balance,
            previous_tier,
            tier: self.tier,
        })
    }
}
