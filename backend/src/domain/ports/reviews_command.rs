//! Driving port for product reviews.

use async_trait::async_trait;
use pagination::{Page, PageParams};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CustomerId, Error, ModerationDecision, ProductId, Rating, Review, ReviewId, ReviewSummary,
    TenantContext,
};

/// A review submitted on behalf of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    /// Reviewed product.
    pub product_id: ProductId,
    /// Reviewing customer.
    pub customer_id: CustomerId,
    /// Star rating.
    pub rating: Rating,
    /// Short headline.
    pub title: String,
    /// Free text.
    #[serde(default)]
    pub body: String,
}

/// Review operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewsCommand: Send + Sync {
    /// Record a new review.
    async fn submit(
        &self,
        ctx: &TenantContext,
        request: SubmitReviewRequest,
    ) -> Result<Review, Error>;

    /// Approve or reject a pending review.
    async fn moderate(
        &self,
        ctx: &TenantContext,
        id: ReviewId,
        decision: ModerationDecision,
    ) -> Result<Review, Error>;

    /// Rating summary over approved reviews.
    async fn summary(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
    ) -> Result<ReviewSummary, Error>;

    /// Approved reviews, newest first.
    async fn list(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
        page: PageParams,
    ) -> Result<Page<Review>, Error>;
}
