//! Purchase orders raised with suppliers and booked into stock.

mod service;

pub use service::PurchasingService;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::{
    CurrencyCode, Error, Money, MoneyError, ProductId, PurchaseOrderId, PurchaseOrderLineId,
    Revisioned,
};

/// Lifecycle position of a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    /// Being prepared; not yet sent.
    Draft,
    /// Sent to the supplier.
    Ordered,
    /// Some units have arrived.
    PartiallyReceived,
    /// Every unit has arrived. Terminal.
    Received,
    /// Abandoned before anything arrived. Terminal.
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ordered => "ordered",
            Self::PartiallyReceived => "partially_received",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Transition attempted on a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOrderAction {
    /// Send to the supplier.
    Submit,
    /// Book in delivered units.
    Receive,
    /// Abandon.
    Cancel,
}

impl PurchaseOrderAction {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Receive => "receive",
            Self::Cancel => "cancel",
        }
    }
}

/// Rule violations raised by purchase order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchasingError {
    /// Supplier name is blank.
    #[error("supplier must not be empty")]
    EmptySupplier,
    /// A purchase order needs at least one line.
    #[error("a purchase order must contain at least one line")]
    NoLines,
    /// A line orders zero units.
    #[error("ordered quantity for product {0} must be positive")]
    ZeroQuantity(ProductId),
    /// A unit cost is negative.
    #[error("unit cost for product {0} must not be negative")]
    NegativeCost(ProductId),
    /// Lines use different currencies.
    #[error("all lines must be priced in {expected}, found {found}")]
    MixedCurrency {
        /// Currency of the first line.
        expected: CurrencyCode,
        /// Offending currency.
        found: CurrencyCode,
    },
    /// The same product appears on two lines.
    #[error("product {0} appears on more than one line")]
    DuplicateProduct(ProductId),
    /// A delivery must book in at least one line.
    #[error("a receipt must contain at least one line")]
    NoReceipts,
    /// Receipt names a line that is not on the order.
    #[error("line {0} is not part of this purchase order")]
    UnknownLine(PurchaseOrderLineId),
    /// Receipt names the same line twice.
    #[error("line {0} is listed more than once")]
    DuplicateReceipt(PurchaseOrderLineId),
    /// Receipt quantity is zero.
    #[error("received quantity for line {0} must be positive")]
    ZeroReceipt(PurchaseOrderLineId),
    /// More units than were ordered.
    #[error("line {line_id} ordered {ordered}, already received {received}, cannot receive {requested} more")]
    OverReceipt {
        /// Line being received.
        line_id: PurchaseOrderLineId,
        /// Units ordered.
        ordered: u32,
        /// Units already received.
        received: u32,
        /// Units in this receipt.
        requested: u32,
    },
    /// The action is not allowed from the current status.
    #[error("cannot {} a purchase order that is {}", action.as_str(), status.as_str())]
    InvalidTransition {
        /// Status at the time of the attempt.
        status: PurchaseOrderStatus,
        /// Attempted action.
        action: PurchaseOrderAction,
    },
    /// Monetary arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl From<PurchasingError> for Error {
    fn from(error: PurchasingError) -> Self {
        let message = error.to_string();
        match error {
            PurchasingError::InvalidTransition { status, action } => Self::conflict(message)
                .with_details(json!({ "status": status.as_str(), "action": action.as_str() })),
            PurchasingError::OverReceipt {
                line_id,
                ordered,
                received,
                requested,
            } => Self::invalid_request(message).with_details(json!({
                "code": "over_receipt",
                "lineId": line_id,
                "ordered": ordered,
                "received": received,
                "requested": requested,
            })),
            PurchasingError::Money(_) => Self::internal(message),
            _ => Self::invalid_request(message),
        }
    }
}

/// Input for one purchase order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineDraft {
    /// Product being bought.
    pub product_id: ProductId,
    /// Units ordered.
    pub quantity: u32,
    /// Cost per unit.
    pub unit_cost: Money,
}

/// Units of one line delivered in a single receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineReceipt {
    /// Line being received.
    pub line_id: PurchaseOrderLineId,
    /// Units delivered.
    pub quantity: u32,
}

/// One product on a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLine {
    /// Line identifier.
    pub id: PurchaseOrderLineId,
    /// Product being bought.
    pub product_id: ProductId,
    /// Units ordered.
    pub ordered: u32,
    /// Units delivered so far.
    pub received: u32,
    /// Cost per unit.
    pub unit_cost: Money,
}

impl PurchaseOrderLine {
    /// Units still to arrive.
    pub const fn outstanding(&self) -> u32 {
        self.ordered.saturating_sub(self.received)
    }
}

/// Stock delivered by a receipt, ready to book into inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockReceipt {
    /// Product delivered.
    pub product_id: ProductId,
    /// Units delivered.
    pub quantity: u32,
    /// Cost per unit.
    pub unit_cost: Money,
}

/// An order placed with a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    supplier: String,
    currency: CurrencyCode,
    lines: Vec<PurchaseOrderLine>,
    status: PurchaseOrderStatus,
    expected_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    revision: u32,
}

impl Revisioned for PurchaseOrder {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl PurchaseOrder {
    /// Validate and create a draft purchase order.
    pub fn create(
        id: PurchaseOrderId,
        supplier: &str,
        lines: Vec<PurchaseOrderLineDraft>,
        expected_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, PurchasingError> {
        let supplier = supplier.trim();
        if supplier.is_empty() {
            return Err(PurchasingError::EmptySupplier);
        }
        let currency = lines
            .first()
            .map(|line| line.unit_cost.currency())
            .ok_or(PurchasingError::NoLines)?;

        let mut products = HashSet::new();
        let mut accepted = Vec::with_capacity(lines.len());
        for draft in lines {
            if draft.quantity == 0 {
                return Err(PurchasingError::ZeroQuantity(draft.product_id));
            }
            if draft.unit_cost.amount_minor() < 0 {
                return Err(PurchasingError::NegativeCost(draft.product_id));
            }
            if draft.unit_cost.currency() != currency {
                return Err(PurchasingError::MixedCurrency {
                    expected: currency,
                    found: draft.unit_cost.currency(),
                });
            }
            if !products.insert(draft.product_id) {
                return Err(PurchasingError::DuplicateProduct(draft.product_id));
            }
            accepted.push(PurchaseOrderLine {
                id: PurchaseOrderLineId::random(),
                product_id: draft.product_id,
                ordered: draft.quantity,
                received: 0,
                unit_cost: draft.unit_cost,
            });
        }

        Ok(Self {
            id,
            supplier: supplier.to_owned(),
            currency,
            lines: accepted,
            status: PurchaseOrderStatus::Draft,
            expected_at,
            created_at: now,
            submitted_at: None,
            received_at: None,
            cancelled_at: None,
            revision: 0,
        })
    }

    /// Purchase order identifier.
    pub const fn id(&self) -> PurchaseOrderId {
        self.id
    }

    /// Supplier name.
    pub fn supplier(&self) -> &str {
        &self.supplier
    }

    /// Currency every line is priced in.
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Ordered lines.
    pub fn lines(&self) -> &[PurchaseOrderLine] {
        self.lines.as_slice()
    }

    /// Current status.
    pub const fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    /// Expected delivery date.
    pub const fn expected_at(&self) -> Option<DateTime<Utc>> {
        self.expected_at
    }

    /// When the order was sent to the supplier.
    pub const fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    /// When the last outstanding unit arrived.
    pub const fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Value of everything ordered.
    pub fn total_cost(&self) -> Result<Money, PurchasingError> {
        let total = self
            .lines
            .iter()
            .try_fold(Money::zero(self.currency), |total, line| {
                total.plus(&line.unit_cost.times(line.ordered)?)
            })?;
        Ok(total)
    }

    fn invalid(&self, action: PurchaseOrderAction) -> PurchasingError {
        PurchasingError::InvalidTransition {
            status: self.status,
            action,
        }
    }

    /// Send a draft to the supplier.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), PurchasingError> {
        if self.status != PurchaseOrderStatus::Draft {
            return Err(self.invalid(PurchaseOrderAction::Submit));
        }
        self.status = PurchaseOrderStatus::Ordered;
        self.submitted_at = Some(now);
        Ok(())
    }

    /// Book in a delivery.
    ///
    /// Every receipt is checked before any is applied, so a single bad line
    /// leaves the order untouched.
    pub fn receive(
        &mut self,
        receipts: &[LineReceipt],
        now: DateTime<Utc>,
    ) -> Result<Vec<StockReceipt>, PurchasingError> {
        if !matches!(
            self.status,
            PurchaseOrderStatus::Ordered | PurchaseOrderStatus::PartiallyReceived
        ) {
            return Err(self.invalid(PurchaseOrderAction::Receive));
        }
        if receipts.is_empty() {
            return Err(PurchasingError::NoReceipts);
        }

        let mut seen = HashSet::new();
        let mut planned = Vec::with_capacity(receipts.len());
        for receipt in receipts {
            if !seen.insert(receipt.line_id) {
                return Err(PurchasingError::DuplicateReceipt(receipt.line_id));
            }
            let (index, line) = self
                .lines
                .iter()
                .enumerate()
                .find(|(_, line)| line.id == receipt.line_id)
                .ok_or(PurchasingError::UnknownLine(receipt.line_id))?;
            if receipt.quantity == 0 {
                return Err(PurchasingError::ZeroReceipt(receipt.line_id));
            }
            if receipt.quantity > line.outstanding() {
                return Err(PurchasingError::OverReceipt {
                    line_id: line.id,
                    ordered: line.ordered,
                    received: line.received,
                    requested: receipt.quantity,
                });
            }
            planned.push((index, receipt.quantity));
        }

        let mut delivered = Vec::with_capacity(planned.len());
        for (index, quantity) in planned {
            if let Some(line) = self.lines.get_mut(index) {
                line.received = line.received.saturating_add(quantity);
                delivered.push(StockReceipt {
                    product_id: line.product_id,
                    quantity,
                    unit_cost: line.unit_cost,
                });
            }
        }
        if self.lines.iter().all(|line| line.outstanding() == 0) {
            self.status = PurchaseOrderStatus::Received;
            self.received_at = Some(now);
        } else {
            self.status = PurchaseOrderStatus::PartiallyReceived;
        }
        Ok(delivered)
    }

    /// Abandon an order before anything has arrived.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), PurchasingError> {
        if !matches!(
            self.status,
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Ordered
        ) {
            return Err(self.invalid(PurchaseOrderAction::Cancel));
        }
        self.status = PurchaseOrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        Ok(())
    }
}
