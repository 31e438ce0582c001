//! Reviews service implementing [`ReviewsCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageParams, PageRequest, paginate};
use serde_json::json;

use super::{
    ModerationDecision, Review, ReviewDraft, ReviewError, ReviewPolicy, ReviewStatus,
    ReviewSummary,
};
use crate::domain::ports::{
    OrderRepository, ReviewRepository, ReviewsCommand, SubmitReviewRequest,
};
use crate::domain::{Error, Permission, ProductId, ReviewId, Revisioned, TenantContext};

/// Review workflow over the review store and purchase history.
#[derive(Clone)]
pub struct ReviewsService<R, O> {
    reviews: Arc<R>,
    orders: Arc<O>,
    policy: ReviewPolicy,
    clock: Arc<dyn Clock>,
}

impl<R, O> ReviewsService<R, O> {
    /// Create a service over the review and order repositories.
    pub fn new(
        reviews: Arc<R>,
        orders: Arc<O>,
        policy: ReviewPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reviews,
            orders,
            policy,
            clock,
        }
    }
}

#[async_trait]
impl<R, O> ReviewsCommand for ReviewsService<R, O>
where
    R: ReviewRepository,
    O: OrderRepository,
{
    async fn submit(
        &self,
        ctx: &TenantContext,
        request: SubmitReviewRequest,
    ) -> Result<Review, Error> {
        ctx.require(Permission::ReviewsSubmit)?;
        let organization_id = ctx.organization_id();
        if self
            .reviews
            .find_by_author(organization_id, &request.product_id, &request.customer_id)
            .await?
            .is_some()
        {
            return Err(ReviewError::AlreadyReviewed {
                product_id: request.product_id,
                customer_id: request.customer_id,
            }
            .into());
        }
        let verified = self
            .orders
            .customer_purchased_product(organization_id, &request.customer_id, &request.product_id)
            .await?;
        let mut review = Review::submit(
            ReviewId::random(),
            ReviewDraft {
                product_id: request.product_id,
                customer_id: request.customer_id,
                rating: request.rating,
                title: request.title,
                body: request.body,
            },
            verified,
            &self.policy,
            self.clock.utc(),
        )?;
        let expected = review.advance_revision();
        self.reviews.save(organization_id, &review, expected).await?;
        tracing::info!(
            organization_id = %organization_id,
            review_id = %review.id(),
            product_id = %review.product_id(),
            verified_purchase = verified,
            status = review.status().as_str(),
            "review submitted"
        );
        Ok(review)
    }

    async fn moderate(
        &self,
        ctx: &TenantContext,
        id: ReviewId,
        decision: ModerationDecision,
    ) -> Result<Review, Error> {
        ctx.require(Permission::ReviewsModerate)?;
        let mut review = self
            .reviews
            .find(ctx.organization_id(), &id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("review {id} not found"))
                    .with_details(json!({ "reviewId": id }))
            })?;
        review.moderate(decision, self.clock.utc())?;
        let expected = review.advance_revision();
        self.reviews.save(ctx.organization_id(), &review, expected).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            review_id = %id,
            status = review.status().as_str(),
            "review moderated"
        );
        Ok(review)
    }

    async fn summary(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
    ) -> Result<ReviewSummary, Error> {
        ctx.require(Permission::CatalogueSearch)?;
        let reviews = self
            .reviews
            .list_for_product(ctx.organization_id(), &product_id)
            .await?;
        Ok(ReviewSummary::from_reviews(product_id, &reviews))
    }

    async fn list(
        &self,
        ctx: &TenantContext,
        product_id: ProductId,
        page: PageParams,
    ) -> Result<Page<Review>, Error> {
        ctx.require(Permission::CatalogueSearch)?;
        let request = PageRequest::from_params(&page)?;
        let mut approved: Vec<Review> = self
            .reviews
            .list_for_product(ctx.organization_id(), &product_id)
            .await?
            .into_iter()
            .filter(|review| review.status() == ReviewStatus::Approved)
            .collect();
        approved.sort_by_key(Review::newest_first_key);
        Ok(paginate(approved, &request, Review::newest_first_key)?)
    }
}
