//! Port for return request persistence.

use async_trait::async_trait;

use crate::domain::{OrderId, OrganizationId, ReturnId, ReturnRequest};

use super::define_port_error;

define_port_error! {
    /// Errors raised by return repository adapters.
    pub enum ReturnRepositoryError for "return repository" with revisions
}

/// Tenant-scoped return requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReturnRepository: Send + Sync {
    /// Find a return request.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        return_id: &ReturnId,
    ) -> Result<Option<ReturnRequest>, ReturnRepositoryError>;

    /// Insert or replace a return request.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        request: &ReturnRequest,
        expected_revision: Option<u32>,
    ) -> Result<(), ReturnRepositoryError>;

    /// Every return filed against an order, in any status.
    async fn list_for_order(
        &self,
        organization_id: &OrganizationId,
        order_id: &OrderId,
    ) -> Result<Vec<ReturnRequest>, ReturnRepositoryError>;
}
