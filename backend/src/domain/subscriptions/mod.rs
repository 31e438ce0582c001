//! Recurring billing lifecycle.
//!
//! A subscription is a state machine over [`SubscriptionStatus`]. The billing
//! calendar is derived from an anchor and a cycle number using
//! [`boundary`]; pausing shifts the anchor instead of rewriting history.

mod schedule;
mod service;

pub use schedule::{BillingInterval, IntervalUnit, boundary};
pub use service::SubscriptionService;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{CustomerId, Error, Money, Revisioned, SubscriptionId};

/// Most billing dates a single forecast may return.
pub const MAX_FORECAST_DATES: usize = 24;

/// Lifecycle position of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial before the first charge.
    Trialing,
    /// Paid up.
    Active,
    /// The latest charge failed and is being retried.
    PastDue,
    /// Billing suspended by the merchant or customer.
    Paused,
    /// Ended. Terminal.
    Cancelled,
}

impl SubscriptionStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Transition attempted on a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    /// Successful charge.
    Renew,
    /// Failed charge.
    RecordPaymentFailure,
    /// Suspend billing.
    Pause,
    /// Resume billing.
    Resume,
    /// End the subscription.
    Cancel,
}

impl SubscriptionAction {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Renew => "renew",
            Self::RecordPaymentFailure => "record_payment_failure",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel => "cancel",
        }
    }
}

/// Rule violations raised by subscription operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The action is not allowed from the current status.
    #[error("cannot {} a subscription that is {}", action.as_str(), status.as_str())]
    InvalidTransition {
        /// Status at the time of the attempt.
        status: SubscriptionStatus,
        /// Attempted action.
        action: SubscriptionAction,
    },
    /// The current period has not ended yet.
    #[error("current period runs until {period_end}")]
    NotDue {
        /// End of the current period.
        period_end: DateTime<Utc>,
    },
    /// Plan name is blank.
    #[error("plan must not be empty")]
    EmptyPlan,
    /// Price must be positive.
    #[error("price must be positive")]
    NonPositivePrice,
    /// Forecast length exceeds [`MAX_FORECAST_DATES`].
    #[error("at most {MAX_FORECAST_DATES} billing dates can be requested, got {0}")]
    TooManyDates(usize),
    /// A period boundary fell outside the representable range.
    #[error("billing date out of range")]
    OutOfRange,
}

impl From<SubscriptionError> for Error {
    fn from(error: SubscriptionError) -> Self {
        let message = error.to_string();
        match error {
            SubscriptionError::InvalidTransition { status, action } => Self::conflict(message)
                .with_details(json!({ "status": status.as_str(), "action": action.as_str() })),
            SubscriptionError::NotDue { period_end } => {
                Self::conflict(message).with_details(json!({ "periodEnd": period_end }))
            }
            SubscriptionError::EmptyPlan
            | SubscriptionError::NonPositivePrice
            | SubscriptionError::TooManyDates(_) => Self::invalid_request(message),
            SubscriptionError::OutOfRange => Self::internal(message),
        }
    }
}

/// Dunning rules applied to failed charges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPolicy {
    retry_schedule_days: Vec<u32>,
    max_failed_payments: u32,
}

impl Default for SubscriptionPolicy {
    fn default() -> Self {
        Self {
            retry_schedule_days: vec![1, 3, 5],
            max_failed_payments: 3,
        }
    }
}

impl SubscriptionPolicy {
    /// Build a policy. An empty schedule retries daily; a zero maximum is
    /// raised to one.
    pub fn new(retry_schedule_days: Vec<u32>, max_failed_payments: u32) -> Self {
        Self {
            retry_schedule_days,
            max_failed_payments: max_failed_payments.max(1),
        }
    }

    /// Failed attempts that cancel the subscription.
    pub const fn max_failed_payments(&self) -> u32 {
        self.max_failed_payments
    }

    /// Retry delays in days, one per failed attempt.
    pub fn retry_schedule_days(&self) -> &[u32] {
        &self.retry_schedule_days
    }

    /// Days to wait before retrying after the `attempt`th failure (1-based).
    /// Attempts beyond the schedule reuse its last entry.
    pub fn retry_delay_days(&self, attempt: u32) -> u32 {
        let index = usize::try_from(attempt.saturating_sub(1)).unwrap_or(usize::MAX);
        self.retry_schedule_days
            .get(index)
            .or_else(|| self.retry_schedule_days.last())
            .copied()
            .unwrap_or(1)
    }
}

/// Input for [`Subscription::create`].
#[derive(Debug, Clone)]
pub struct SubscriptionDraft {
    pub customer_id: CustomerId,
    pub plan: String,
    pub price: Money,
    pub interval: BillingInterval,
    pub trial_days: u32,
}

/// A customer's recurring plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    id: SubscriptionId,
    customer_id: CustomerId,
    plan: String,
    price: Money,
    interval: BillingInterval,
    status: SubscriptionStatus,
    anchor: DateTime<Utc>,
    current_cycle: u32,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    trial_end: Option<DateTime<Utc>>,
    failed_payment_attempts: u32,
    next_retry_at: Option<DateTime<Utc>>,
    cancel_at_period_end: bool,
    paused_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    revision: u32,
}

fn period(
    anchor: DateTime<Utc>,
    interval: BillingInterval,
    cycle: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SubscriptionError> {
    let next = cycle.checked_add(1).ok_or(SubscriptionError::OutOfRange)?;
    let start = boundary(anchor, interval, cycle).ok_or(SubscriptionError::OutOfRange)?;
    let end = boundary(anchor, interval, next).ok_or(SubscriptionError::OutOfRange)?;
    Ok((start, end))
}

impl Revisioned for Subscription {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl Subscription {
    /// Start a subscription, optionally with a free trial.
    ///
    /// With a trial the first paid cycle is anchored at the trial end;
    /// otherwise billing is anchored at `now` and cycle 0 starts immediately.
    pub fn create(
        id: SubscriptionId,
        draft: SubscriptionDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, SubscriptionError> {
        let plan = draft.plan.trim();
        if plan.is_empty() {
            return Err(SubscriptionError::EmptyPlan);
        }
        if !draft.price.is_positive() {
            return Err(SubscriptionError::NonPositivePrice);
        }
        let (status, anchor, start, end, trial_end) = if draft.trial_days > 0 {
            let trial_end = now
                .checked_add_signed(
                    TimeDelta::try_days(i64::from(draft.trial_days))
                        .ok_or(SubscriptionError::OutOfRange)?,
                )
                .ok_or(SubscriptionError::OutOfRange)?;
            (
                SubscriptionStatus::Trialing,
                trial_end,
                now,
                trial_end,
                Some(trial_end),
            )
        } else {
            let (start, end) = period(now, draft.interval, 0)?;
            (SubscriptionStatus::Active, now, start, end, None)
        };
        Ok(Self {
            id,
            customer_id: draft.customer_id,
            plan: plan.to_owned(),
            price: draft.price,
            interval: draft.interval,
            status,
            anchor,
            current_cycle: 0,
            current_period_start: start,
            current_period_end: end,
            trial_end,
            failed_payment_attempts: 0,
            next_retry_at: None,
            cancel_at_period_end: false,
            paused_at: None,
            cancelled_at: None,
            revision: 0,
        })
    }

    /// Subscription identifier.
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Subscribed customer.
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Plan name.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    /// Price charged per period.
    pub const fn price(&self) -> Money {
        self.price
    }

    /// Billing interval.
    pub const fn interval(&self) -> BillingInterval {
        self.interval
    }

    /// Current status.
    pub const fn status(&self) -> SubscriptionStatus {
        self.status
    }

    /// Instant billing periods are counted from.
    pub const fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Zero-based paid cycle number.
    pub const fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    /// Start of the current period (or trial).
    pub const fn current_period_start(&self) -> DateTime<Utc> {
        self.current_period_start
    }

    /// End of the current period (or trial).
    pub const fn current_period_end(&self) -> DateTime<Utc> {
        self.current_period_end
    }

    /// End of the free trial, if there was one.
    pub const fn trial_end(&self) -> Option<DateTime<Utc>> {
        self.trial_end
    }

    /// Consecutive failed charges.
    pub const fn failed_payment_attempts(&self) -> u32 {
        self.failed_payment_attempts
    }

    /// When the next charge retry is due.
    pub const fn next_retry_at(&self) -> Option<DateTime<Utc>> {
        self.next_retry_at
    }

    /// Whether the subscription ends instead of renewing.
    pub const fn cancel_at_period_end(&self) -> bool {
        self.cancel_at_period_end
    }

    /// When the subscription was paused.
    pub const fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// When the subscription was cancelled.
    pub const fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    fn invalid(&self, action: SubscriptionAction) -> SubscriptionError {
        SubscriptionError::InvalidTransition {
            status: self.status,
            action,
        }
    }

    fn ensure_due(&self, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if now < self.current_period_end {
            return Err(SubscriptionError::NotDue {
                period_end: self.current_period_end,
            });
        }
        Ok(())
    }

    /// Cycle billed by the next successful charge from trial or active.
    fn next_cycle(&self) -> Result<u32, SubscriptionError> {
        match self.status {
            SubscriptionStatus::Trialing => Ok(0),
            _ => self
                .current_cycle
                .checked_add(1)
                .ok_or(SubscriptionError::OutOfRange),
        }
    }

    fn enter_cycle(&mut self, cycle: u32) -> Result<(), SubscriptionError> {
        let (start, end) = period(self.anchor, self.interval, cycle)?;
        self.current_cycle = cycle;
        self.current_period_start = start;
        self.current_period_end = end;
        Ok(())
    }

    fn end(&mut self, now: DateTime<Utc>) {
        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.next_retry_at = None;
        self.paused_at = None;
    }

    /// Record a successful charge. Returns the amount charged, or `None` when
    /// the subscription ended at its period boundary instead.
    pub fn renew(&mut self, now: DateTime<Utc>) -> Result<Option<Money>, SubscriptionError> {
        match self.status {
            SubscriptionStatus::Trialing | SubscriptionStatus::Active => {
                self.ensure_due(now)?;
                if self.cancel_at_period_end {
                    self.end(now);
                    return Ok(None);
                }
                let cycle = self.next_cycle()?;
                self.enter_cycle(cycle)?;
            }
            SubscriptionStatus::PastDue => {}
            SubscriptionStatus::Paused | SubscriptionStatus::Cancelled => {
                return Err(self.invalid(SubscriptionAction::Renew));
            }
        }
        self.status = SubscriptionStatus::Active;
        self.failed_payment_attempts = 0;
        self.next_retry_at = None;
        Ok(Some(self.price))
    }

    /// Record a failed charge.
    ///
    /// The first failure moves the subscription into the period it was trying
    /// to pay for; later failures retry that same period. Reaching the policy
    /// maximum cancels the subscription. A subscription flagged to cancel at
    /// period end simply ends, since no further period is owed.
    pub fn record_payment_failure(
        &mut self,
        policy: &SubscriptionPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), SubscriptionError> {
        match self.status {
            SubscriptionStatus::Trialing | SubscriptionStatus::Active => {
                self.ensure_due(now)?;
                if self.cancel_at_period_end {
                    self.end(now);
                    return Ok(());
                }
                let cycle = self.next_cycle()?;
                self.enter_cycle(cycle)?;
            }
            SubscriptionStatus::PastDue => {}
            SubscriptionStatus::Paused | SubscriptionStatus::Cancelled => {
                return Err(self.invalid(SubscriptionAction::RecordPaymentFailure));
            }
        }
        self.failed_payment_attempts = self.failed_payment_attempts.saturating_add(1);
        if self.failed_payment_attempts >= policy.max_failed_payments() {
            self.end(now);
            return Ok(());
        }
        let delay = TimeDelta::try_days(i64::from(
            policy.retry_delay_days(self.failed_payment_attempts),
        ))
        .ok_or(SubscriptionError::OutOfRange)?;
        self.status = SubscriptionStatus::PastDue;
        self.next_retry_at = Some(
            now.checked_add_signed(delay)
                .ok_or(SubscriptionError::OutOfRange)?,
        );
        Ok(())
    }

    /// Suspend an active subscription.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::Active {
            return Err(self.invalid(SubscriptionAction::Pause));
        }
        self.status = SubscriptionStatus::Paused;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Resume a paused subscription, pushing the billing calendar back by
    /// the time spent paused.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        let paused_at = match (self.status, self.paused_at) {
            (SubscriptionStatus::Paused, Some(paused_at)) => paused_at,
            _ => return Err(self.invalid(SubscriptionAction::Resume)),
        };
        let paused_for = now.signed_duration_since(paused_at).max(TimeDelta::zero());
        self.anchor = self
            .anchor
            .checked_add_signed(paused_for)
            .ok_or(SubscriptionError::OutOfRange)?;
        self.enter_cycle(self.current_cycle)?;
        self.status = SubscriptionStatus::Active;
        self.paused_at = None;
        Ok(())
    }

    /// Cancel now, or flag active and trialing subscriptions to end when the
    /// current period does.
    pub fn cancel(
        &mut self,
        at_period_end: bool,
        now: DateTime<Utc>,
    ) -> Result<(), SubscriptionError> {
        match self.status {
            SubscriptionStatus::Cancelled => Err(self.invalid(SubscriptionAction::Cancel)),
            SubscriptionStatus::Active | SubscriptionStatus::Trialing if at_period_end => {
                self.cancel_at_period_end = true;
                Ok(())
            }
            _ => {
                self.end(now);
                Ok(())
            }
        }
    }

    /// The next `count` billing dates, starting with the end of the current
    /// period. Empty once the subscription is ending.
    pub fn upcoming_billing_dates(
        &self,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, SubscriptionError> {
        if count > MAX_FORECAST_DATES {
            return Err(SubscriptionError::TooManyDates(count));
        }
        if self.status == SubscriptionStatus::Cancelled || self.cancel_at_period_end {
            return Ok(Vec::new());
        }
        if self.status == SubscriptionStatus::Trialing {
            return (0..count)
                .map(|offset| {
                    let n = u32::try_from(offset).map_err(|_| SubscriptionError::OutOfRange)?;
                    boundary(self.anchor, self.interval, n).ok_or(SubscriptionError::OutOfRange)
                })
                .collect();
        }
        (1..=count)
            .map(|offset| {
                let n = u32::try_from(offset)
                    .ok()
                    .and_then(|offset| self.current_cycle.checked_add(offset))
                    .ok_or(SubscriptionError::OutOfRange)?;
                boundary(self.anchor, self.interval, n).ok_or(SubscriptionError::OutOfRange)
            })
            .collect()
    }
}
