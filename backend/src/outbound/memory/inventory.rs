//! In-memory `InventoryRepository`.

use async_trait::async_trait;

use crate::domain::ports::{InventoryRepository, InventoryRepositoryError};
use crate::domain::{OrganizationId, ProductId, StockLevel};

use super::table::TenantTable;

/// Stock levels held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryInventoryRepository {
    stock: TenantTable<ProductId, StockLevel>,
}

impl InMemoryInventoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Option<StockLevel>, InventoryRepositoryError> {
        Ok(self.stock.get(organization_id, product_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        stock: &StockLevel,
        expected_revision: Option<u32>,
    ) -> Result<(), InventoryRepositoryError> {
        self.stock
            .save_revision(organization_id, stock.product_id(), stock.clone(), expected_revision)
            .await
            .map_err(|stale| InventoryRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<StockLevel>, InventoryRepositoryError> {
        Ok(self.stock.list(organization_id).await)
    }
}
