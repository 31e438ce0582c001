//! Product reviews: submission, moderation, and rating summaries.

mod service;

pub use service::ReviewsService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::money::div_round_half_up;
use super::{CustomerId, Error, ProductId, ReviewId, Revisioned};

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

/// Longest accepted body, in characters.
pub const MAX_BODY_CHARS: usize = 5_000;

/// Star rating from one to five.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Validate a star count.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::Rating;
    ///
    /// assert!(Rating::new(5).is_ok());
    /// assert!(Rating::new(0).is_err());
    /// ```
    pub const fn new(stars: u8) -> Result<Self, ReviewError> {
        match stars {
            1..=5 => Ok(Self(stars)),
            _ => Err(ReviewError::InvalidRating(stars)),
        }
    }

    /// Number of stars.
    pub const fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// Moderation state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting moderation.
    Pending,
    /// Visible on the storefront.
    Approved,
    /// Hidden.
    Rejected,
}

impl ReviewStatus {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Outcome chosen by a moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    /// Publish the review.
    Approve,
    /// Hide the review.
    Reject,
}

/// Rule violations raised by review operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// Rating outside one to five.
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    /// Title is blank.
    #[error("title must not be empty")]
    EmptyTitle,
    /// Title is too long.
    #[error("title must be at most {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
    /// Body is too long.
    #[error("body must be at most {MAX_BODY_CHARS} characters")]
    BodyTooLong,
    /// The customer already reviewed this product.
    #[error("customer {customer_id} has already reviewed product {product_id}")]
    AlreadyReviewed {
        /// Reviewed product.
        product_id: ProductId,
        /// Reviewing customer.
        customer_id: CustomerId,
    },
    /// Only pending reviews can be moderated.
    #[error("review is already {}", .0.as_str())]
    AlreadyModerated(ReviewStatus),
}

impl From<ReviewError> for Error {
    fn from(error: ReviewError) -> Self {
        let message = error.to_string();
        match error {
            ReviewError::InvalidRating(_) => {
                Self::invalid_request(message).with_details(json!({ "field": "rating" }))
            }
            ReviewError::EmptyTitle | ReviewError::TitleTooLong => {
                Self::invalid_request(message).with_details(json!({ "field": "title" }))
            }
            ReviewError::BodyTooLong => {
                Self::invalid_request(message).with_details(json!({ "field": "body" }))
            }
            ReviewError::AlreadyReviewed {
                product_id,
                customer_id,
            } => Self::conflict(message).with_details(json!({
                "code": "duplicate_review",
                "productId": product_id,
                "customerId": customer_id,
            })),
            ReviewError::AlreadyModerated(status) => {
                Self::conflict(message).with_details(json!({ "status": status.as_str() }))
            }
        }
    }
}

/// Review moderation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReviewPolicy {
    /// Publish reviews from verified buyers without moderation.
    pub auto_approve_verified: bool,
}

/// Input for [`Review::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    /// Reviewed product.
    pub product_id: ProductId,
    /// Reviewing customer.
    pub customer_id: CustomerId,
    /// Star rating.
    pub rating: Rating,
    /// Short headline.
    pub title: String,
    /// Free text; may be empty.
    pub body: String,
}

/// A customer's review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    id: ReviewId,
    product_id: ProductId,
    customer_id: CustomerId,
    rating: Rating,
    title: String,
    body: String,
    status: ReviewStatus,
    verified_purchase: bool,
    created_at: DateTime<Utc>,
    moderated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    revision: u32,
}

impl Revisioned for Review {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl Review {
    /// Validate a draft and decide its initial status.
    pub fn submit(
        id: ReviewId,
        draft: ReviewDraft,
        verified_purchase: bool,
        policy: &ReviewPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, ReviewError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ReviewError::EmptyTitle);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(ReviewError::TitleTooLong);
        }
        let body = draft.body.trim();
        if body.chars().count() > MAX_BODY_CHARS {
            return Err(ReviewError::BodyTooLong);
        }
        let (status, moderated_at) = if policy.auto_approve_verified && verified_purchase {
            (ReviewStatus::Approved, Some(now))
        } else {
            (ReviewStatus::Pending, None)
        };
        Ok(Self {
            id,
            product_id: draft.product_id,
            customer_id: draft.customer_id,
            rating: draft.rating,
            title: title.to_owned(),
            body: body.to_owned(),
            status,
            verified_purchase,
            created_at: now,
            moderated_at,
            revision: 0,
        })
    }

    /// Review identifier.
    pub const fn id(&self) -> ReviewId {
        self.id
    }

    /// Reviewed product.
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Reviewing customer.
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Star rating.
    pub const fn rating(&self) -> Rating {
        self.rating
    }

    /// Headline.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Free text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Moderation state.
    pub const fn status(&self) -> ReviewStatus {
        self.status
    }

    /// Whether the customer received the product.
    pub const fn verified_purchase(&self) -> bool {
        self.verified_purchase
    }

    /// Submission time.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Moderation time.
    pub const fn moderated_at(&self) -> Option<DateTime<Utc>> {
        self.moderated_at
    }

    /// Apply a moderation decision to a pending review.
    pub fn moderate(
        &mut self,
        decision: ModerationDecision,
        now: DateTime<Utc>,
    ) -> Result<(), ReviewError> {
        if self.status != ReviewStatus::Pending {
            return Err(ReviewError::AlreadyModerated(self.status));
        }
        self.status = match decision {
            ModerationDecision::Approve => ReviewStatus::Approved,
            ModerationDecision::Reject => ReviewStatus::Rejected,
        };
        self.moderated_at = Some(now);
        Ok(())
    }

    /// Sort key placing newer reviews first, ties broken by id.
    pub(crate) fn newest_first_key(&self) -> (i64, ReviewId) {
        (self.created_at.timestamp_micros().saturating_neg(), self.id)
    }
}

/// Aggregate rating of a product over its approved reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    /// Summarised product.
    pub product_id: ProductId,
    /// Approved reviews counted.
    pub count: u64,
    /// Mean rating times 100, rounded half-up; zero without reviews.
    pub average_hundredths: u32,
    /// Review counts for one to five stars.
    pub distribution: [u64; 5],
}

impl ReviewSummary {
    /// Summarise the approved reviews among `reviews`.
    ///
    /// # Examples
    /// ```
    /// use storefront::domain::{ProductId, ReviewSummary};
    ///
    /// let empty = ReviewSummary::from_reviews(ProductId::random(), &[]);
    /// assert_eq!(empty.count, 0);
    /// assert_eq!(empty.average_hundredths, 0);
    /// ```
    pub fn from_reviews(product_id: ProductId, reviews: &[Review]) -> Self {
        let mut distribution = [0_u64; 5];
        let mut count = 0_u64;
        let mut stars_total = 0_u64;
        for review in reviews
            .iter()
            .filter(|review| review.status == ReviewStatus::Approved)
        {
            let stars = review.rating.stars();
            if let Some(slot) = distribution.get_mut(usize::from(stars.saturating_sub(1))) {
                *slot = slot.saturating_add(1);
            }
            count = count.saturating_add(1);
            stars_total = stars_total.saturating_add(u64::from(stars));
        }
        let average_hundredths = if count == 0 {
            0
        } else {
            div_round_half_up(i128::from(stars_total) * 100, i128::from(count))
                .and_then(|average| u32::try_from(average).ok())
                .unwrap_or(0)
        };
        Self {
            product_id,
            count,
            average_hundredths,
            distribution,
        }
    }
}

#[cfg(test)]
mod tests;
