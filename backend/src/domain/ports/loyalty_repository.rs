//! Port for loyalty account persistence.

use async_trait::async_trait;

use crate::domain::{CustomerId, LoyaltyAccount, OrganizationId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by loyalty repository adapters.
    pub enum LoyaltyRepositoryError for "loyalty repository" with revisions
}

/// Tenant-scoped loyalty accounts, keyed by customer.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyRepository: Send + Sync {
    /// Find a customer's account.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        customer_id: &CustomerId,
    ) -> Result<Option<LoyaltyAccount>, LoyaltyRepositoryError>;

    /// Insert or replace an account.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        account: &LoyaltyAccount,
        expected_revision: Option<u32>,
    ) -> Result<(), LoyaltyRepositoryError>;
}
