//! Inventory read service and the shared stock-update helpers used by
//! returns and purchasing.

use std::sync::Arc;

use async_trait::async_trait;

use super::{InventoryError, StockLevel};
use crate::domain::ports::{InventoryQuery, InventoryRepository, InventoryRepositoryError};
use crate::domain::{
    Error, Money, MoneyError, OrganizationId, Permission, ProductId, Revisioned, TenantContext,
};

impl From<InventoryError> for Error {
    fn from(error: InventoryError) -> Self {
        let message = error.to_string();
        match error {
            InventoryError::InsufficientStock { .. }
            | InventoryError::Money(MoneyError::CurrencyMismatch { .. }) => Self::conflict(message),
            InventoryError::ZeroQuantity => Self::invalid_request(message),
            InventoryError::Money(_) | InventoryError::Overflow => Self::internal(message),
        }
    }
}

/// Load a product's stock record, starting from empty when none exists.
pub(crate) async fn load_stock<I>(
    inventory: &I,
    organization_id: &OrganizationId,
    product_id: ProductId,
) -> Result<StockLevel, Error>
where
    I: InventoryRepository + ?Sized,
{
    Ok(inventory
        .find(organization_id, &product_id)
        .await?
        .unwrap_or_else(|| StockLevel::empty(product_id)))
}

/// One change to a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StockChange {
    /// Returned units back on hand without touching the average cost.
    Restock { product_id: ProductId, quantity: u32 },
    /// Purchased units received at a unit cost.
    Receive {
        product_id: ProductId,
        quantity: u32,
        unit_cost: Money,
    },
}

impl StockChange {
    const fn product_id(&self) -> ProductId {
        match *self {
            Self::Restock { product_id, .. } | Self::Receive { product_id, .. } => product_id,
        }
    }

    fn apply(&self, stock: &mut StockLevel) -> Result<(), InventoryError> {
        match *self {
            Self::Restock { quantity, .. } => stock.adjust(i64::from(quantity)),
            Self::Receive {
                quantity,
                unit_cost,
                ..
            } => stock.receive(quantity, unit_cost),
        }
    }
}

/// Attempts per product before a contended stock write gives up.
const STOCK_WRITE_ATTEMPTS: u32 = 3;

/// Changes grouped per product, products in first-seen order.
fn by_product(changes: &[StockChange]) -> Vec<(ProductId, Vec<StockChange>)> {
    let mut grouped: Vec<(ProductId, Vec<StockChange>)> = Vec::new();
    for change in changes {
        let product_id = change.product_id();
        match grouped.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, group)) => group.push(*change),
            None => grouped.push((product_id, vec![*change])),
        }
    }
    grouped
}

async fn load_changed<I>(
    inventory: &I,
    organization_id: &OrganizationId,
    product_id: ProductId,
    changes: &[StockChange],
) -> Result<StockLevel, Error>
where
    I: InventoryRepository + ?Sized,
{
    let mut stock = load_stock(inventory, organization_id, product_id).await?;
    for change in changes {
        change.apply(&mut stock)?;
    }
    Ok(stock)
}

/// Check every change against current stock without writing anything.
///
/// Callers run this before committing their own aggregate so a rejected
/// change (a cost in a second currency, an overflow) leaves no trace.
pub(crate) async fn check_stock_changes<I>(
    inventory: &I,
    organization_id: &OrganizationId,
    changes: &[StockChange],
) -> Result<(), Error>
where
    I: InventoryRepository + ?Sized,
{
    for (product_id, group) in by_product(changes) {
        load_changed(inventory, organization_id, product_id, &group).await?;
    }
    Ok(())
}

/// Write every change, one revision-checked save per product.
///
/// A save that loses a race reloads the record and replays that product's
/// changes, up to [`STOCK_WRITE_ATTEMPTS`] times.
pub(crate) async fn apply_stock_changes<I>(
    inventory: &I,
    organization_id: &OrganizationId,
    changes: &[StockChange],
) -> Result<Vec<StockLevel>, Error>
where
    I: InventoryRepository + ?Sized,
{
    let grouped = by_product(changes);
    let mut written = Vec::with_capacity(grouped.len());
    for (product_id, group) in grouped {
        let mut attempt = 1;
        loop {
            let mut stock = load_changed(inventory, organization_id, product_id, &group).await?;
            let expected = stock.advance_revision();
            match inventory.save(organization_id, &stock, expected).await {
                Ok(()) => {
                    tracing::debug!(%product_id, on_hand = stock.on_hand(), "stock updated");
                    written.push(stock);
                    break;
                }
                Err(InventoryRepositoryError::RevisionMismatch { .. })
                    if attempt < STOCK_WRITE_ATTEMPTS =>
                {
                    tracing::debug!(%product_id, attempt, "stock write raced; reloading");
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
    Ok(written)
}

/// Read-only inventory service.
#[derive(Clone)]
pub struct InventoryQueryService<I> {
    inventory: Arc<I>,
}

impl<I> InventoryQueryService<I> {
    /// Create a service over `inventory`.
    pub fn new(inventory: Arc<I>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl<I> InventoryQuery for InventoryQueryService<I>
where
    I: InventoryRepository,
{
    async fn get_stock(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
    ) -> Result<StockLevel, Error> {
        ctx.require(Permission::InventoryView)?;
        load_stock(self.inventory.as_ref(), ctx.organization_id(), product_id).await
    }

    async fn list_low_stock(&self, ctx: &TenantContext) -> Result<Vec<StockLevel>, Error> {
        ctx.require(Permission::InventoryView)?;
        let mut low: Vec<StockLevel> = self
            .inventory
            .list(ctx.organization_id())
            .await?
            .into_iter()
            .filter(StockLevel::is_low_stock)
            .collect();
        low.sort_by(|a, b| {
            a.available()
                .cmp(&b.available())
                .then_with(|| a.product_id().cmp(&b.product_id()))
        });
        Ok(low)
    }
}
