//! Order read model shared by returns, reviews, and loyalty.
//!
//! Orders are created and fulfilled elsewhere; this module only models the
//! parts other rules depend on: which lines were bought, how much was paid,
//! and how much has already been refunded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    CurrencyCode, CustomerId, Money, MoneyError, OrderId, OrderLineId, ProductId, Revisioned,
};

/// Lifecycle position of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed but not yet paid.
    Pending,
    /// Paid, awaiting fulfilment.
    Paid,
    /// Shipped or handed over.
    Fulfilled,
    /// Confirmed delivered.
    Delivered,
    /// Cancelled before fulfilment.
    Cancelled,
    /// Some of the paid amount has been refunded.
    PartiallyRefunded,
    /// The full paid amount has been refunded.
    Refunded,
}

impl OrderStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Fulfilled => "fulfilled",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
        }
    }
}

/// Validation and state errors for orders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Order has no lines.
    #[error("order must contain at least one line")]
    NoLines,
    /// A line has zero quantity.
    #[error("order line {0} must have a positive quantity")]
    ZeroQuantity(OrderLineId),
    /// Line or total currency differs from the order currency.
    #[error("order amounts must share the order currency {0}")]
    MixedCurrency(CurrencyCode),
    /// Refund amount is not positive.
    #[error("refund amount must be positive")]
    NonPositiveRefund,
    /// Refund exceeds what is left to refund.
    #[error("refund of {requested} exceeds refundable remainder {remaining}")]
    RefundExceedsRemaining {
        /// Requested refund.
        requested: Money,
        /// Remaining refundable amount.
        remaining: Money,
    },
    /// Order status does not allow refunds.
    #[error("order in status {0:?} cannot be refunded")]
    NotRefundable(OrderStatus),
    /// Monetary arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// One purchased product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Line identifier.
    pub id: OrderLineId,
    /// Purchased product.
    pub product_id: ProductId,
    /// Units purchased.
    pub quantity: u32,
    /// Price paid per unit.
    pub unit_price: Money,
}

/// Input for [`Order::new`].
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub total: Money,
    pub placed_at: DateTime<Utc>,
    pub fulfilled_at: Option<DateTime<Utc>>,
}

/// Order snapshot with refund tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    total: Money,
    refunded: Money,
    placed_at: DateTime<Utc>,
    fulfilled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    revision: u32,
}

impl Revisioned for Order {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl Order {
    /// Validate a draft into an order with nothing refunded yet.
    pub fn new(draft: OrderDraft) -> Result<Self, OrderError> {
        let currency = draft.total.currency();
        if draft.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &draft.lines {
            if line.quantity == 0 {
                return Err(OrderError::ZeroQuantity(line.id));
            }
            if line.unit_price.currency() != currency {
                return Err(OrderError::MixedCurrency(currency));
            }
        }
        Money::non_negative(draft.total.amount_minor(), currency)?;
        Ok(Self {
            id: draft.id,
            customer_id: draft.customer_id,
            status: draft.status,
            lines: draft.lines,
            total: draft.total,
            refunded: Money::zero(currency),
            placed_at: draft.placed_at,
            fulfilled_at: draft.fulfilled_at,
            revision: 0,
        })
    }

    /// Order identifier.
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Purchasing customer.
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Current status.
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Purchased lines.
    pub fn lines(&self) -> &[OrderLine] {
        self.lines.as_slice()
    }

    /// Look up a line by id.
    pub fn line(&self, line_id: OrderLineId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    /// Amount paid.
    pub const fn total(&self) -> Money {
        self.total
    }

    /// Amount refunded so far.
    pub const fn refunded(&self) -> Money {
        self.refunded
    }

    /// Order currency.
    pub const fn currency(&self) -> CurrencyCode {
        self.total.currency()
    }

    /// Time the order was placed.
    pub const fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Time the order was fulfilled, if it has been.
    pub const fn fulfilled_at(&self) -> Option<DateTime<Utc>> {
        self.fulfilled_at
    }

    /// Paid amount not yet refunded.
    pub fn refundable_remaining(&self) -> Result<Money, OrderError> {
        Ok(self.total.minus(&self.refunded)?)
    }

    /// Whether goods from this order can be sent back.
    pub fn is_returnable(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Fulfilled | OrderStatus::Delivered | OrderStatus::PartiallyRefunded
        ) && self.fulfilled_at.is_some()
    }

    /// Whether the customer has received goods from this order.
    pub const fn counts_as_purchase(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Fulfilled | OrderStatus::Delivered | OrderStatus::PartiallyRefunded
        )
    }

    /// Record a refund against the order.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use storefront::domain::{
    ///     CustomerId, Money, Order, OrderDraft, OrderId, OrderLine, OrderLineId, OrderStatus,
    ///     ProductId,
    /// };
    ///
    /// let price = Money::parse(500, "USD").expect("valid");
    /// let mut order = Order::new(OrderDraft {
    ///     id: OrderId::random(),
    ///     customer_id: CustomerId::random(),
    ///     status: OrderStatus::Delivered,
    ///     lines: vec![OrderLine {
    ///         id: OrderLineId::random(),
    ///         product_id: ProductId::random(),
    ///         quantity: 2,
    ///         unit_price: price,
    ///     }],
    ///     total: Money::parse(1_000, "USD").expect("valid"),
    ///     placed_at: Utc::now(),
    ///     fulfilled_at: Some(Utc::now()),
    /// })
    /// .expect("valid order");
    ///
    /// order.apply_refund(price).expect("partial refund");
    /// assert_eq!(order.status(), OrderStatus::PartiallyRefunded);
    /// order.apply_refund(price).expect("final refund");
    /// assert_eq!(order.status(), OrderStatus::Refunded);
    /// ```
    pub fn apply_refund(&mut self, amount: Money) -> Result<(), OrderError> {
        if !matches!(
            self.status,
            OrderStatus::Paid
                | OrderStatus::Fulfilled
                | OrderStatus::Delivered
                | OrderStatus::PartiallyRefunded
        ) {
            return Err(OrderError::NotRefundable(self.status));
        }
        if !amount.is_positive() {
            return Err(OrderError::NonPositiveRefund);
        }
        let remaining = self.refundable_remaining()?;
        if amount.amount_minor() > remaining.amount_minor() {
            return Err(OrderError::RefundExceedsRemaining {
                requested: amount,
                remaining,
            });
        }
        self.refunded = self.refunded.plus(&amount)?;
        self.status = if self.refunded == self.total {
            OrderStatus::Refunded
        } else {
            OrderStatus::PartiallyRefunded
        };
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders shared by tests of modules that read orders.

    use chrono::{DateTime, Utc};

    use super::*;

    pub(crate) fn usd(amount: i64) -> Money {
        Money::parse(amount, "USD").expect("valid currency")
    }

    pub(crate) fn line(product_id: ProductId, quantity: u32, unit_price: i64) -> OrderLine {
        OrderLine {
            id: OrderLineId::random(),
            product_id,
            quantity,
            unit_price: usd(unit_price),
        }
    }

    pub(crate) fn delivered_order(
        customer_id: CustomerId,
        lines: Vec<OrderLine>,
        fulfilled_at: DateTime<Utc>,
    ) -> Order {
        let total = lines
            .iter()
            .map(|line| line.unit_price.amount_minor() * i64::from(line.quantity))
            .sum();
        Order::new(OrderDraft {
            id: OrderId::random(),
            customer_id,
            status: OrderStatus::Delivered,
            lines,
            total: usd(total),
            placed_at: fulfilled_at,
            fulfilled_at: Some(fulfilled_at),
        })
        .expect("valid order")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::test_support::*;
    use super::*;

    #[test]
    fn refund_cannot_exceed_remainder() {
        let mut order = delivered_order(
            CustomerId::random(),
            vec![line(ProductId::random(), 1, 1_000)],
            Utc::now(),
        );
        order.apply_refund(usd(600)).expect("first refund");
        let err = order.apply_refund(usd(500)).expect_err("too much");
        assert!(matches!(err, OrderError::RefundExceedsRemaining { .. }));
        assert_eq!(order.refunded(), usd(600));
    }

    #[test]
    fn pending_orders_are_not_refundable() {
        let mut order = Order::new(OrderDraft {
            id: OrderId::random(),
            customer_id: CustomerId::random(),
            status: OrderStatus::Pending,
            lines: vec![line(ProductId::random(), 1, 100)],
            total: usd(100),
            placed_at: Utc::now(),
            fulfilled_at: None,
        })
        .expect("valid order");
        assert_eq!(
            order.apply_refund(usd(100)),
            Err(OrderError::NotRefundable(OrderStatus::Pending))
        );
        assert!(!order.is_returnable());
    }

    #[test]
    fn rejects_lines_in_foreign_currency() {
        let mut bad_line = line(ProductId::random(), 1, 100);
        bad_line.unit_price = Money::parse(100, "EUR").expect("valid");
        let err = Order::new(OrderDraft {
            id: OrderId::random(),
            customer_id: CustomerId::random(),
            status: OrderStatus::Paid,
            lines: vec![bad_line],
            total: usd(100),
            placed_at: Utc::now(),
            fulfilled_at: None,
        })
        .expect_err("mixed currency");
        assert!(matches!(err, OrderError::MixedCurrency(_)));
    }
}
