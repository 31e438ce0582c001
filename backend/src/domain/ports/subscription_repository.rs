//! Port for subscription persistence.

use async_trait::async_trait;

use crate::domain::{OrganizationId, Subscription, SubscriptionId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by subscription repository adapters.
    pub enum SubscriptionRepositoryError for "subscription repository" with revisions
}

/// Tenant-scoped subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        subscription_id: &SubscriptionId,
    ) -> Result<Option<Subscription>, SubscriptionRepositoryError>;

    /// Insert or replace a subscription.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        subscription: &Subscription,
        expected_revision: Option<u32>,
    ) -> Result<(), SubscriptionRepositoryError>;
}
