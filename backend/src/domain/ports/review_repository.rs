//! Port for product review persistence.

use async_trait::async_trait;

use crate::domain::{CustomerId, OrganizationId, ProductId, Review, ReviewId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by review repository adapters.
    pub enum ReviewRepositoryError for "review repository" with revisions
}

/// Tenant-scoped product reviews.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Find a review by id.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        review_id: &ReviewId,
    ) -> Result<Option<Review>, ReviewRepositoryError>;

    /// Find the review a customer left on a product, if any.
    async fn find_by_author(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
        customer_id: &CustomerId,
    ) -> Result<Option<Review>, ReviewRepositoryError>;

    /// Insert or replace a review.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        review: &Review,
        expected_revision: Option<u32>,
    ) -> Result<(), ReviewRepositoryError>;

    /// Every review of a product, in any status.
    async fn list_for_product(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Vec<Review>, ReviewRepositoryError>;
}
