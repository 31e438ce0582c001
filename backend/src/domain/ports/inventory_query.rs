//! Driving port for stock lookups.

use async_trait::async_trait;

use crate::domain::{Error, ProductId, StockLevel, TenantContext};

/// Inventory reads consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryQuery: Send + Sync {
    /// Stock of one product; products never stocked report an empty level.
    async fn get_stock(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
    ) -> Result<StockLevel, Error>;

    /// Products at or below their reorder point, lowest availability first.
    async fn list_low_stock(&self, ctx: &TenantContext) -> Result<Vec<StockLevel>, Error>;
}
