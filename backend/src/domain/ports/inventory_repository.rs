//! Port for stock level persistence.

use async_trait::async_trait;

use crate::domain::{OrganizationId, ProductId, StockLevel};

use super::define_port_error;

define_port_error! {
    /// Errors raised by inventory repository adapters.
    pub enum InventoryRepositoryError for "inventory repository" with revisions
}

/// Tenant-scoped stock levels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Find the stock record for a product.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Option<StockLevel>, InventoryRepositoryError>;

    /// Insert or replace a stock record.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        stock: &StockLevel,
        expected_revision: Option<u32>,
    ) -> Result<(), InventoryRepositoryError>;

    /// All stock records of the organization.
    async fn list(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StockLevel>, InventoryRepositoryError>;
}
