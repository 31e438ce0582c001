//! In-memory `SubscriptionRepository`.

use async_trait::async_trait;

use crate::domain::ports::{SubscriptionRepository, SubscriptionRepositoryError};
use crate::domain::{OrganizationId, Subscription, SubscriptionId};

use super::table::TenantTable;

/// Subscriptions held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    subscriptions: TenantTable<SubscriptionId, Subscription>,
}

impl InMemorySubscriptionRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Subscription>, SubscriptionRepositoryError> {
        Ok(self.subscriptions.get(organization_id, subscription_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        subscription: &Subscription,
        expected_revision: Option<u32>,
    ) -> Result<(), SubscriptionRepositoryError> {
        self.subscriptions
            .save_revision(
                organization_id,
                subscription.id(),
                subscription.clone(),
                expected_revision,
            )
            .await
            .map_err(|stale| SubscriptionRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }
}
