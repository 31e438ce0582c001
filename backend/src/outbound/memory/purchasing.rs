//! In-memory `PurchaseOrderRepository`.

use async_trait::async_trait;

use crate::domain::ports::{PurchaseOrderRepository, PurchaseOrderRepositoryError};
use crate::domain::{OrganizationId, PurchaseOrder, PurchaseOrderId};

use super::table::TenantTable;

/// Purchase orders held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseOrderRepository {
    purchase_orders: TenantTable<PurchaseOrderId, PurchaseOrder>,
}

impl InMemoryPurchaseOrderRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PurchaseOrderRepository for InMemoryPurchaseOrderRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        purchase_order_id: &PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, PurchaseOrderRepositoryError> {
        Ok(self
            .purchase_orders
            .get(organization_id, purchase_order_id)
            .await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        purchase_order: &PurchaseOrder,
        expected_revision: Option<u32>,
    ) -> Result<(), PurchaseOrderRepositoryError> {
        self.purchase_orders
            .save_revision(
                organization_id,
                purchase_order.id(),
                purchase_order.clone(),
                expected_revision,
            )
            .await
            .map_err(|stale| PurchaseOrderRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }
}
