//! In-memory `ReviewRepository`.

use async_trait::async_trait;

use crate::domain::ports::{ReviewRepository, ReviewRepositoryError};
use crate::domain::{CustomerId, OrganizationId, ProductId, Review, ReviewId};

use super::table::TenantTable;

/// Reviews held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryReviewRepository {
    reviews: TenantTable<ReviewId, Review>,
}

impl InMemoryReviewRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        review_id: &ReviewId,
    ) -> Result<Option<Review>, ReviewRepositoryError> {
        Ok(self.reviews.get(organization_id, review_id).await)
    }

    async fn find_by_author(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
        customer_id: &CustomerId,
    ) -> Result<Option<Review>, ReviewRepositoryError> {
        Ok(self
            .reviews
            .find(organization_id, |review| {
                review.product_id() == *product_id && review.customer_id() == *customer_id
            })
            .await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        review: &Review,
        expected_revision: Option<u32>,
    ) -> Result<(), ReviewRepositoryError> {
        self.reviews
            .save_revision(organization_id, review.id(), review.clone(), expected_revision)
            .await
            .map_err(|stale| ReviewRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }

    async fn list_for_product(
        &self,
        organization_id: &OrganizationId,
        product_id: &ProductId,
    ) -> Result<Vec<Review>, ReviewRepositoryError> {
        Ok(self
            .reviews
            .filter(organization_id, |review| review.product_id() == *product_id)
            .await)
    }
}
