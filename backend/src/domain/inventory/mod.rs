//! Stock levels per product.
//!
//! Purchasing receipts and return restocks both land here. The average unit
//! cost is a moving average updated on every costed receipt.

mod service;

pub use service::InventoryQueryService;
pub(crate) use service::{StockChange, apply_stock_changes, check_stock_changes};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::div_round_half_up;
use super::{Money, MoneyError, ProductId, Revisioned};

/// Errors raised by stock mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Adjustment would take on-hand stock below zero.
    #[error("stock for product {product_id} cannot go below zero (on hand {on_hand}, delta {delta})")]
    InsufficientStock {
        /// Product being adjusted.
        product_id: ProductId,
        /// Units on hand before the adjustment.
        on_hand: i64,
        /// Requested change.
        delta: i64,
    },
    /// Receipt quantity must be positive.
    #[error("received quantity must be positive")]
    ZeroQuantity,
    /// Cost arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
    /// Quantity arithmetic overflowed.
    #[error("stock quantity overflowed")]
    Overflow,
}

/// Stock position of a single product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    product_id: ProductId,
    on_hand: i64,
    reserved: i64,
    reorder_point: i64,
    average_unit_cost: Option<Money>,
    #[serde(default)]
    revision: u32,
}

impl Revisioned for StockLevel {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl StockLevel {
    /// Empty stock record for a product.
    pub const fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            on_hand: 0,
            reserved: 0,
            reorder_point: 0,
            average_unit_cost: None,
            revision: 0,
        }
    }

    /// Set the threshold at or below which the product counts as low stock.
    #[must_use]
    pub const fn with_reorder_point(mut self, reorder_point: i64) -> Self {
        self.reorder_point = reorder_point;
        self
    }

    /// Set units held for unfulfilled orders.
    #[must_use]
    pub const fn with_reserved(mut self, reserved: i64) -> Self {
        self.reserved = reserved;
        self
    }

    /// Product this record belongs to.
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Physical units on hand.
    pub const fn on_hand(&self) -> i64 {
        self.on_hand
    }

    /// Units held for unfulfilled orders.
    pub const fn reserved(&self) -> i64 {
        self.reserved
    }

    /// Low-stock threshold.
    pub const fn reorder_point(&self) -> i64 {
        self.reorder_point
    }

    /// Moving-average unit cost, once any costed stock has been received.
    pub const fn average_unit_cost(&self) -> Option<Money> {
        self.average_unit_cost
    }

    /// Units free to sell.
    pub const fn available(&self) -> i64 {
        self.on_hand.saturating_sub(self.reserved)
    }

    /// Whether available stock is at or below the reorder point.
    pub const fn is_low_stock(&self) -> bool {
        self.available() <= self.reorder_point
    }

    /// Apply an uncosted adjustment (returns, stocktake corrections).
    pub fn adjust(&mut self, delta: i64) -> Result<(), InventoryError> {
        let next = self
            .on_hand
            .checked_add(delta)
            .ok_or(InventoryError::Overflow)?;
        if next < 0 {
            return Err(InventoryError::InsufficientStock {
                product_id: self.product_id,
                on_hand: self.on_hand,
                delta,
            });
        }
        self.on_hand = next;
        Ok(())
    }

    /// Receive costed stock and fold its cost into the moving average.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{Money, ProductId, StockLevel};
    ///
    /// let mut stock = StockLevel::empty(ProductId::random());
    /// stock.receive(10, Money::parse(400, "USD").expect("valid")).expect("receipt");
    /// stock.receive(10, Money::parse(500, "USD").expect("valid")).expect("receipt");
    /// assert_eq!(stock.on_hand(), 20);
    /// assert_eq!(stock.average_unit_cost().map(|c| c.amount_minor()), Some(450));
    /// ```
    pub fn receive(&mut self, quantity: u32, unit_cost: Money) -> Result<(), InventoryError> {
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity);
        }
        let incoming = i64::from(quantity);
        let next_on_hand = self
            .on_hand
            .checked_add(incoming)
            .ok_or(InventoryError::Overflow)?;

        let next_cost = match self.average_unit_cost {
            Some(current) if self.on_hand > 0 => {
                if current.currency() != unit_cost.currency() {
                    return Err(MoneyError::CurrencyMismatch {
                        left: current.currency(),
                        right: unit_cost.currency(),
                    }
                    .into());
                }
                let held_value = i128::from(self.on_hand)
                    .checked_mul(i128::from(current.amount_minor()))
                    .ok_or(InventoryError::Overflow)?;
                let incoming_value = i128::from(incoming)
                    .checked_mul(i128::from(unit_cost.amount_minor()))
                    .ok_or(InventoryError::Overflow)?;
                let total_value = held_value
                    .checked_add(incoming_value)
                    .ok_or(InventoryError::Overflow)?;
                let average = div_round_half_up(total_value, i128::from(next_on_hand))
                    .ok_or(InventoryError::Overflow)?;
                let average = i64::try_from(average).map_err(|_| InventoryError::Overflow)?;
                Money::new(average, unit_cost.currency())
            }
            _ => unit_cost,
        };

        self.on_hand = next_on_hand;
        self.average_unit_cost = Some(next_cost);
        Ok(())
    }
}
