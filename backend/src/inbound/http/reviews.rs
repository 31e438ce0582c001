//! Product review handlers.
//!
//! ```text
//! POST /api/v1/reviews
//! POST /api/v1/reviews/{id}/moderation
//! GET  /api/v1/products/{productId}/reviews?cursor=...&limit=20
//! GET  /api/v1/products/{productId}/reviews/summary
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use pagination::PageParams;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::SubmitReviewRequest;
use crate::domain::{
    Error, ModerationDecision, ProductId, Rating, Review, ReviewId, ReviewStatus, ReviewSummary,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{LinksBody, page_links};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_required_id};

const PRODUCT_ID: FieldName = FieldName::new("productId");
const CUSTOMER_ID: FieldName = FieldName::new("customerId");
const REVIEW_ID: FieldName = FieldName::new("reviewId");

/// Review as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    /// Review identifier.
    pub id: String,
    /// Reviewed product.
    pub product_id: String,
    /// Author.
    pub customer_id: String,
    /// Stars from one to five.
    pub rating: u8,
    /// Headline.
    pub title: String,
    /// Review text.
    pub body: String,
    /// pending, approved or rejected.
    #[schema(value_type = String, example = "approved")]
    pub status: ReviewStatus,
    /// The customer bought the product before reviewing it.
    pub verified_purchase: bool,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When the review was approved or rejected.
    pub moderated_at: Option<DateTime<Utc>>,
}

impl From<Review> for ReviewResponse {
    fn from(value: Review) -> Self {
        Self {
            id: value.id().to_string(),
            product_id: value.product_id().to_string(),
            customer_id: value.customer_id().to_string(),
            rating: value.rating().stars(),
            title: value.title().to_owned(),
            body: value.body().to_owned(),
            status: value.status(),
            verified_purchase: value.verified_purchase(),
            created_at: value.created_at(),
            moderated_at: value.moderated_at(),
        }
    }
}

/// Request payload for submitting a review.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewBody {
    pub product_id: Option<String>,
    pub customer_id: Option<String>,
    #[schema(example = 5)]
    pub rating: u8,
    #[schema(example = "Lovely mug")]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Request payload for moderating a review.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModerationBody {
    /// approve or reject.
    #[schema(value_type = String, example = "approve")]
    pub decision: ModerationDecision,
}

/// Rating aggregate for a product.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummaryResponse {
    /// Summarised product.
    pub product_id: String,
    /// Approved reviews counted.
    pub count: u64,
    /// Mean rating rounded to two decimals, e.g. 4.33.
    pub average_rating: f64,
    /// Review counts keyed by star value.
    pub distribution: [u64; 5],
}

impl From<ReviewSummary> for ReviewSummaryResponse {
    fn from(value: ReviewSummary) -> Self {
        Self {
            product_id: value.product_id.to_string(),
            count: value.count,
            average_rating: f64::from(value.average_hundredths) / 100.0,
            distribution: value.distribution,
        }
    }
}

/// Query parameters for listing reviews.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    /// Token from a previous page's `nextCursor`.
    pub cursor: Option<String>,
    /// Page size, 1 to 100; defaults to 20.
    pub limit: Option<usize>,
}

/// One page of approved reviews.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPageResponse {
    pub items: Vec<ReviewResponse>,
    pub limit: usize,
    pub next_cursor: Option<String>,
    pub links: LinksBody,
}

/// Submit a review for moderation.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = SubmitReviewBody,
    responses(
        (status = 201, description = "Review recorded", body = ReviewResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 409, description = "Customer already reviewed the product", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "submitReview"
)]
#[post("/reviews")]
pub async fn submit_review(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SubmitReviewBody>,
) -> ApiResult<HttpResponse> {
    let ctx = session.require_tenant()?;
    let SubmitReviewBody {
        product_id,
        customer_id,
        rating,
        title,
        body,
    } = payload.into_inner();
    let request = SubmitReviewRequest {
        product_id: parse_required_id(product_id, PRODUCT_ID)?,
        customer_id: parse_required_id(customer_id, CUSTOMER_ID)?,
        rating: Rating::new(rating).map_err(Error::from)?,
        title,
        body,
    };
    let review = state.reviews.submit(&ctx, request).await?;
    Ok(HttpResponse::Created().json(ReviewResponse::from(review)))
}

/// Approve or reject a pending review.
#[utoipa::path(
    post,
    path = "/api/v1/reviews/{id}/moderation",
    params(("id" = String, Path, description = "Review identifier")),
    request_body = ModerationBody,
    responses(
        (status = 200, description = "Review moderated", body = ReviewResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Already moderated", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "moderateReview"
)]
#[post("/reviews/{id}/moderation")]
pub async fn moderate_review(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ModerationBody>,
) -> ApiResult<web::Json<ReviewResponse>> {
    let ctx = session.require_tenant()?;
    let id: ReviewId = parse_id(&path, REVIEW_ID)?;
    let review = state.reviews.moderate(&ctx, id, payload.decision).await?;
    Ok(web::Json(review.into()))
}

/// List approved reviews for a product, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/products/{productId}/reviews",
    params(
        ("productId" = String, Path, description = "Product identifier"),
        ReviewListQuery
    ),
    responses(
        (status = 200, description = "Page of reviews", body = ReviewPageResponse),
        (status = 400, description = "Invalid cursor or limit", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "listProductReviews"
)]
#[get("/products/{product_id}/reviews")]
pub async fn list_reviews(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<ReviewListQuery>,
) -> ApiResult<web::Json<ReviewPageResponse>> {
    let ctx = session.require_tenant()?;
    let product_id: ProductId = parse_id(&path, PRODUCT_ID)?;
    let ReviewListQuery { cursor, limit } = query.into_inner();
    let page = state
        .reviews
        .list(&ctx, product_id, PageParams { cursor, limit })
        .await?;
    let links = page_links(&req, page.limit, page.next_cursor.as_deref())?;
    Ok(web::Json(ReviewPageResponse {
        limit: page.limit,
        next_cursor: page.next_cursor,
        items: page.items.into_iter().map(ReviewResponse::from).collect(),
        links,
    }))
}

/// Summarise approved ratings for a product.
#[utoipa::path(
    get,
    path = "/api/v1/products/{productId}/reviews/summary",
    params(("productId" = String, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Rating summary", body = ReviewSummaryResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["reviews"],
    operation_id = "getProductReviewSummary"
)]
#[get("/products/{product_id}/reviews/summary")]
pub async fn review_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReviewSummaryResponse>> {
    let ctx = session.require_tenant()?;
    let product_id: ProductId = parse_id(&path, PRODUCT_ID)?;
    let summary = state.reviews.summary(&ctx, product_id).await?;
    Ok(web::Json(summary.into()))
}
