//! Port for purchase order persistence.

use async_trait::async_trait;

use crate::domain::{OrganizationId, PurchaseOrder, PurchaseOrderId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by purchase order repository adapters.
    pub enum PurchaseOrderRepositoryError for "purchase order repository" with revisions
}

/// Tenant-scoped purchase orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseOrderRepository: Send + Sync {
    /// Find a purchase order.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        purchase_order_id: &PurchaseOrderId,
    ) -> Result<Option<PurchaseOrder>, PurchaseOrderRepositoryError>;

    /// Insert or replace a purchase order.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        purchase_order: &PurchaseOrder,
        expected_revision: Option<u32>,
    ) -> Result<(), PurchaseOrderRepositoryError>;
}
