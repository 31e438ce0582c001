//! Return merchandise authorisations.
//!
//! A return moves through `requested → approved → received → refunded`, with
//! rejection and cancellation as side exits. Quantities are checked against
//! the order and every earlier return that is still live.

mod refund;
mod service;

pub use refund::RefundBreakdown;
pub use service::ReturnsService;

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{
    CustomerId, Error, Money, MoneyError, Order, OrderError, OrderId, OrderLineId, OrderStatus,
    ProductId, ReturnId, Revisioned,
};

/// Lifecycle position of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Filed, awaiting a decision.
    Requested,
    /// Accepted; goods may be sent back.
    Approved,
    /// Declined. Terminal.
    Rejected,
    /// Withdrawn. Terminal.
    Cancelled,
    /// Goods arrived at the warehouse.
    Received,
    /// Money returned. Terminal.
    Refunded,
}

impl ReturnStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Received => "received",
            Self::Refunded => "refunded",
        }
    }

    /// Whether units in this return still count against the order.
    pub const fn holds_quantity(self) -> bool {
        !matches!(self, Self::Rejected | Self::Cancelled)
    }
}

/// Why the customer is sending goods back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    /// Arrived broken.
    Damaged,
    /// Not what was ordered.
    WrongItem,
    /// Did not match its listing.
    NotAsDescribed,
    /// Customer no longer wants it; attracts the restocking fee.
    ChangedMind,
    /// Anything else.
    Other,
}

/// State of a returned unit on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    /// Can go back on the shelf.
    Resellable,
    /// Written off.
    Damaged,
}

/// Customer input for one returned order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineRequest {
    /// Order line being returned.
    pub order_line_id: OrderLineId,
    /// Units being returned.
    pub quantity: u32,
    /// Why.
    pub reason: ReturnReason,
}

/// Inspection result for one returned line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedLine {
    /// Order line that arrived.
    pub order_line_id: OrderLineId,
    /// Condition of the arrived units.
    pub condition: ItemCondition,
}

/// One returned order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    /// Order line being returned.
    pub order_line_id: OrderLineId,
    /// Product on that line.
    pub product_id: ProductId,
    /// Units returned.
    pub quantity: u32,
    /// Price paid per unit.
    pub unit_price: Money,
    /// Why.
    pub reason: ReturnReason,
    /// Condition recorded on receipt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ItemCondition>,
}

/// Transition attempted on a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnAction {
    /// Accept the request.
    Approve,
    /// Decline the request.
    Reject,
    /// Withdraw the request.
    Cancel,
    /// Book the goods in.
    Receive,
    /// Pay the customer back.
    Refund,
}

impl ReturnAction {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Receive => "receive",
            Self::Refund => "refund",
        }
    }
}

/// Rule violations raised by return operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    /// The order is not in a returnable state.
    #[error("order in status {} cannot be returned", .0.as_str())]
    OrderNotReturnable(OrderStatus),
    /// The return window has closed.
    #[error("return window of {window_days} days has closed")]
    WindowExpired {
        /// Configured window.
        window_days: u32,
    },
    /// A return needs at least one line.
    #[error("a return must contain at least one line")]
    NoLines,
    /// The same order line appears twice.
    #[error("order line {0} is listed more than once")]
    DuplicateLine(OrderLineId),
    /// The order line does not belong to the order or the return.
    #[error("order line {0} is not part of this order")]
    UnknownLine(OrderLineId),
    /// Quantity is zero.
    #[error("quantity for order line {0} must be positive")]
    ZeroQuantity(OrderLineId),
    /// More units than remain returnable.
    #[error("order line {order_line_id} has {available} returnable units, {requested} requested")]
    QuantityExceeded {
        /// Line being returned.
        order_line_id: OrderLineId,
        /// Units requested.
        requested: u32,
        /// Units still returnable.
        available: u32,
    },
    /// A received return must record every line's condition.
    #[error("condition missing for order line {0}")]
    MissingCondition(OrderLineId),
    /// The action is not allowed from the current status.
    #[error("cannot {} a return that is {}", action.as_str(), status.as_str())]
    InvalidTransition {
        /// Status at the time of the attempt.
        status: ReturnStatus,
        /// Attempted action.
        action: ReturnAction,
    },
    /// The order has nothing left to refund.
    #[error("order has no refundable balance left")]
    NothingToRefund,
    /// Applying the refund to the order failed.
    #[error(transparent)]
    Order(#[from] OrderError),
    /// Monetary arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl From<ReturnError> for Error {
    fn from(error: ReturnError) -> Self {
        let message = error.to_string();
        match error {
            ReturnError::InvalidTransition { status, action } => Self::conflict(message)
                .with_details(json!({ "status": status.as_str(), "action": action.as_str() })),
            ReturnError::OrderNotReturnable(status) => {
                Self::conflict(message).with_details(json!({
                    "code": "order_not_returnable",
                    "orderStatus": status,
                }))
            }
            ReturnError::NothingToRefund | ReturnError::Order(_) => Self::conflict(message),
            ReturnError::WindowExpired { window_days } => {
                Self::invalid_request(message).with_details(json!({
                    "code": "return_window_expired",
                    "windowDays": window_days,
                }))
            }
            ReturnError::QuantityExceeded {
                order_line_id,
                requested,
                available,
            } => Self::invalid_request(message).with_details(json!({
                "code": "quantity_exceeded",
                "orderLineId": order_line_id,
                "requested": requested,
                "available": available,
            })),
            ReturnError::Money(_) => Self::internal(message),
            ReturnError::NoLines
            | ReturnError::DuplicateLine(_)
            | ReturnError::UnknownLine(_)
            | ReturnError::ZeroQuantity(_)
            | ReturnError::MissingCondition(_) => Self::invalid_request(message),
        }
    }
}

/// Window and fee rules for returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnPolicy {
    /// Days after fulfilment a return may be filed.
    pub return_window_days: u32,
    /// Fee withheld from change-of-mind lines, in basis points.
    pub restocking_fee_bps: u32,
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        Self {
            return_window_days: 30,
            restocking_fee_bps: 1_500,
        }
    }
}

/// A customer's request to send goods back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    id: ReturnId,
    order_id: OrderId,
    customer_id: CustomerId,
    status: ReturnStatus,
    lines: Vec<ReturnLine>,
    requested_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refund: Option<RefundBreakdown>,
    #[serde(default)]
    revision: u32,
}

fn returned_so_far(existing: &[ReturnRequest], order_line_id: OrderLineId) -> u32 {
    existing
        .iter()
        .filter(|request| request.status.holds_quantity())
        .flat_map(|request| request.lines.iter())
        .filter(|line| line.order_line_id == order_line_id)
        .map(|line| line.quantity)
        .fold(0_u32, u32::saturating_add)
}

impl Revisioned for ReturnRequest {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl ReturnRequest {
    /// Validate and file a return against `order`.
    ///
    /// `existing` holds every earlier return of the same order; rejected and
    /// cancelled ones do not reduce the returnable quantity.
    pub fn open(
        id: ReturnId,
        order: &Order,
        existing: &[ReturnRequest],
        lines: Vec<ReturnLineRequest>,
        policy: &ReturnPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, ReturnError> {
        let fulfilled_at = match order.fulfilled_at() {
            Some(fulfilled_at) if order.is_returnable() => fulfilled_at,
            _ => return Err(ReturnError::OrderNotReturnable(order.status())),
        };
        let expired = TimeDelta::try_days(i64::from(policy.return_window_days))
            .and_then(|window| fulfilled_at.checked_add_signed(window))
            .is_some_and(|deadline| now > deadline);
        if expired {
            return Err(ReturnError::WindowExpired {
                window_days: policy.return_window_days,
            });
        }
        if lines.is_empty() {
            return Err(ReturnError::NoLines);
        }

        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(lines.len());
        for requested in lines {
            let order_line_id = requested.order_line_id;
            if !seen.insert(order_line_id) {
                return Err(ReturnError::DuplicateLine(order_line_id));
            }
            let order_line = order
                .line(order_line_id)
                .ok_or(ReturnError::UnknownLine(order_line_id))?;
            if requested.quantity == 0 {
                return Err(ReturnError::ZeroQuantity(order_line_id));
            }
            let available = order_line
                .quantity
                .saturating_sub(returned_so_far(existing, order_line_id));
            if requested.quantity > available {
                return Err(ReturnError::QuantityExceeded {
                    order_line_id,
                    requested: requested.quantity,
                    available,
                });
            }
            accepted.push(ReturnLine {
                order_line_id,
                product_id: order_line.product_id,
                quantity: requested.quantity,
                unit_price: order_line.unit_price,
                reason: requested.reason,
                condition: None,
            });
        }

        Ok(Self {
            id,
            order_id: order.id(),
            customer_id: order.customer_id(),
            status: ReturnStatus::Requested,
            lines: accepted,
            requested_at: now,
            decided_at: None,
            received_at: None,
            refunded_at: None,
            note: None,
            refund: None,
            revision: 0,
        })
    }

    /// Return identifier.
    pub const fn id(&self) -> ReturnId {
        self.id
    }

    /// Order the goods came from.
    pub const fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Customer returning the goods.
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Current status.
    pub const fn status(&self) -> ReturnStatus {
        self.status
    }

    /// Returned lines.
    pub fn lines(&self) -> &[ReturnLine] {
        self.lines.as_slice()
    }

    /// When the return was filed.
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// When the request was approved, rejected, or cancelled.
    pub const fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// When the goods arrived.
    pub const fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// When the money went back.
    pub const fn refunded_at(&self) -> Option<DateTime<Utc>> {
        self.refunded_at
    }

    /// Rejection note.
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Refund calculation, once refunded.
    pub const fn refund_breakdown(&self) -> Option<RefundBreakdown> {
        self.refund
    }

    fn guard(&self, action: ReturnAction, allowed: &[ReturnStatus]) -> Result<(), ReturnError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(ReturnError::InvalidTransition {
                status: self.status,
                action,
            })
        }
    }

    /// Accept a pending request.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), ReturnError> {
        self.guard(ReturnAction::Approve, &[ReturnStatus::Requested])?;
        self.status = ReturnStatus::Approved;
        self.decided_at = Some(now);
        Ok(())
    }

    /// Decline a pending request.
    pub fn reject(&mut self, note: Option<String>, now: DateTime<Utc>) -> Result<(), ReturnError> {
        self.guard(ReturnAction::Reject, &[ReturnStatus::Requested])?;
        self.status = ReturnStatus::Rejected;
        self.decided_at = Some(now);
        self.note = note
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());
        Ok(())
    }

    /// Withdraw a request before the goods arrive.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), ReturnError> {
        self.guard(
            ReturnAction::Cancel,
            &[ReturnStatus::Requested, ReturnStatus::Approved],
        )?;
        self.status = ReturnStatus::Cancelled;
        self.decided_at = Some(now);
        Ok(())
    }

    /// Book in the goods. Every line needs a condition; returns the
    /// `(product, units)` pairs that can be restocked.
    pub fn receive(
        &mut self,
        received: &[ReceivedLine],
        now: DateTime<Utc>,
    ) -> Result<Vec<(ProductId, u32)>, ReturnError> {
        self.guard(ReturnAction::Receive, &[ReturnStatus::Approved])?;
        let stray = received.iter().find(|entry| {
            !self
                .lines
                .iter()
                .any(|line| line.order_line_id == entry.order_line_id)
        });
        if let Some(entry) = stray {
            return Err(ReturnError::UnknownLine(entry.order_line_id));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = received
            .iter()
            .find(|entry| !seen.insert(entry.order_line_id))
        {
            return Err(ReturnError::DuplicateLine(duplicate.order_line_id));
        }
        let conditions = self
            .lines
            .iter()
            .map(|line| {
                received
                    .iter()
                    .find(|entry| entry.order_line_id == line.order_line_id)
                    .map(|entry| entry.condition)
                    .ok_or(ReturnError::MissingCondition(line.order_line_id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut restock = Vec::new();
        for (line, condition) in self.lines.iter_mut().zip(conditions) {
            line.condition = Some(condition);
            if condition == ItemCondition::Resellable {
                restock.push((line.product_id, line.quantity));
            }
        }
        self.status = ReturnStatus::Received;
        self.received_at = Some(now);
        Ok(restock)
    }

    /// Refund a received return and record it against `order`.
    pub fn refund(
        &mut self,
        order: &mut Order,
        policy: &ReturnPolicy,
        now: DateTime<Utc>,
    ) -> Result<RefundBreakdown, ReturnError> {
        self.guard(ReturnAction::Refund, &[ReturnStatus::Received])?;
        let breakdown = refund::calculate(
            &self.lines,
            order.currency(),
            policy.restocking_fee_bps,
            order.refundable_remaining()?,
        )?;
        if !breakdown.total.is_positive() {
            return Err(ReturnError::NothingToRefund);
        }
        order.apply_refund(breakdown.total)?;
        self.status = ReturnStatus::Refunded;
        self.refunded_at = Some(now);
        self.refund = Some(breakdown);
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests;
