//! In-memory `ReturnRepository`.

use async_trait::async_trait;

use crate::domain::ports::{ReturnRepository, ReturnRepositoryError};
use crate::domain::{OrderId, OrganizationId, ReturnId, ReturnRequest};

use super::table::TenantTable;

/// Return requests held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryReturnRepository {
    returns: TenantTable<ReturnId, ReturnRequest>,
}

impl InMemoryReturnRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReturnRepository for InMemoryReturnRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        return_id: &ReturnId,
    ) -> Result<Option<ReturnRequest>, ReturnRepositoryError> {
        Ok(self.returns.get(organization_id, return_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        request: &ReturnRequest,
        expected_revision: Option<u32>,
    ) -> Result<(), ReturnRepositoryError> {
        self.returns
            .save_revision(organization_id, request.id(), request.clone(), expected_revision)
            .await
            .map_err(|stale| ReturnRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }

    async fn list_for_order(
        &self,
        organization_id: &OrganizationId,
        order_id: &OrderId,
    ) -> Result<Vec<ReturnRequest>, ReturnRepositoryError> {
        Ok(self
            .returns
            .filter(organization_id, |request| request.order_id() == *order_id)
            .await)
    }
}
