//! In-memory `LoyaltyRepository`.

use async_trait::async_trait;

use crate::domain::ports::{LoyaltyRepository, LoyaltyRepositoryError};
use crate::domain::{CustomerId, LoyaltyAccount, OrganizationId};

use super::table::TenantTable;

/// Loyalty accounts held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryLoyaltyRepository {
    accounts: TenantTable<CustomerId, LoyaltyAccount>,
}

impl InMemoryLoyaltyRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoyaltyRepository for InMemoryLoyaltyRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        customer_id: &CustomerId,
    ) -> Result<Option<LoyaltyAccount>, LoyaltyRepositoryError> {
        Ok(self.accounts.get(organization_id, customer_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        account: &LoyaltyAccount,
        expected_revision: Option<u32>,
    ) -> Result<(), LoyaltyRepositoryError> {
        self.accounts
            .save_revision(
                organization_id,
                account.customer_id(),
                account.clone(),
                expected_revision,
            )
            .await
            .map_err(|stale| LoyaltyRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }
}
