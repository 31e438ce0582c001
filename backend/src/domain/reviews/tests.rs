//! Review validation, moderation, summaries, and listing.

use std::sync::Arc;

use chrono::TimeDelta;
use pagination::PageParams;
use rstest::rstest;

use super::*;
use crate::domain::ports::{
    MockOrderRepository, MockReviewRepository, ReviewsCommand, SubmitReviewRequest,
};
use crate::domain::test_support::{at, fixed_clock, tenant};
use crate::domain::{ErrorCode, Role};

fn now() -> DateTime<Utc> {
    at(2025, 6, 1)
}

fn draft(stars: u8, title: &str) -> ReviewDraft {
    ReviewDraft {
        product_id: ProductId::random(),
        customer_id: CustomerId::random(),
        rating: Rating::new(stars).expect("rating"),
        title: title.to_owned(),
        body: String::new(),
    }
}

fn approved(product_id: ProductId, stars: u8, created_at: DateTime<Utc>) -> Review {
    let mut review_draft = draft(stars, "ok");
    review_draft.product_id = product_id;
    let policy = ReviewPolicy {
        auto_approve_verified: true,
    };
    Review::submit(ReviewId::random(), review_draft, true, &policy, created_at).expect("review")
}

#[rstest]
#[case::zero(0)]
#[case::six(6)]
fn ratings_outside_one_to_five_are_rejected(#[case] stars: u8) {
    assert_eq!(Rating::new(stars), Err(ReviewError::InvalidRating(stars)));
    assert!(serde_json::from_value::<Rating>(serde_json::json!(stars)).is_err());
}

#[rstest]
#[case::blank("   ", ReviewError::EmptyTitle)]
#[case::long(&"x".repeat(MAX_TITLE_CHARS + 1), ReviewError::TitleTooLong)]
fn titles_are_validated(#[case] title: &str, #[case] expected: ReviewError) {
    let err = Review::submit(
        ReviewId::random(),
        draft(4, title),
        false,
        &ReviewPolicy::default(),
        now(),
    )
    .expect_err("invalid title");
    assert_eq!(err, expected);
}

#[test]
fn title_limit_counts_characters_not_bytes() {
    let title = "é".repeat(MAX_TITLE_CHARS);
    let review = Review::submit(
        ReviewId::random(),
        draft(4, &title),
        false,
        &ReviewPolicy::default(),
        now(),
    )
    .expect("120 characters");
    assert_eq!(review.title().chars().count(), MAX_TITLE_CHARS);
}

#[test]
fn oversized_body_is_rejected() {
    let mut long = draft(3, "fine");
    long.body = "b".repeat(MAX_BODY_CHARS + 1);
    let err = Review::submit(ReviewId::random(), long, false, &ReviewPolicy::default(), now())
        .expect_err("too long");
    assert_eq!(Error::from(err).details().expect("details")["field"], "body");
}

#[rstest]
#[case::verified_with_auto_approval(true, true, ReviewStatus::Approved)]
#[case::unverified_with_auto_approval(true, false, ReviewStatus::Pending)]
#[case::verified_without_auto_approval(false, true, ReviewStatus::Pending)]
fn initial_status_follows_policy(
    #[case] auto_approve_verified: bool,
    #[case] verified: bool,
    #[case] expected: ReviewStatus,
) {
    let policy = ReviewPolicy {
        auto_approve_verified,
    };
    let review = Review::submit(ReviewId::random(), draft(5, "great"), verified, &policy, now())
        .expect("review");
    assert_eq!(review.status(), expected);
    assert_eq!(review.verified_purchase(), verified);
}

#[test]
fn moderation_happens_once() {
    let mut review = Review::submit(
        ReviewId::random(),
        draft(2, "meh"),
        false,
        &ReviewPolicy::default(),
        now(),
    )
    .expect("review");
    review
        .moderate(ModerationDecision::Reject, now())
        .expect("reject");
    assert_eq!(review.status(), ReviewStatus::Rejected);
    let err = review
        .moderate(ModerationDecision::Approve, now())
        .expect_err("already moderated");
    assert_eq!(err, ReviewError::AlreadyModerated(ReviewStatus::Rejected));
    assert_eq!(Error::from(err).code(), ErrorCode::Conflict);
}

#[test]
fn summary_counts_only_approved_reviews() {
    let product_id = ProductId::random();
    let pending = Review::submit(
        ReviewId::random(),
        draft(1, "pending"),
        false,
        &ReviewPolicy::default(),
        now(),
    )
    .expect("pending");
    let reviews = vec![
        approved(product_id, 5, now()),
        approved(product_id, 4, now()),
        approved(product_id, 4, now()),
        pending,
    ];
    let summary = ReviewSummary::from_reviews(product_id, &reviews);
    assert_eq!(summary.count, 3);
    // 13 / 3 = 4.333.. -> 433
    assert_eq!(summary.average_hundredths, 433);
    assert_eq!(summary.distribution, [0, 0, 0, 2, 1]);
}

#[test]
fn summary_average_rounds_half_up() {
    let product_id = ProductId::random();
    let reviews: Vec<Review> = [5, 4, 4, 4, 4, 4, 4, 4]
        .into_iter()
        .map(|stars| approved(product_id, stars, now()))
        .collect();
    // 33 / 8 = 4.125 -> 413
    assert_eq!(
        ReviewSummary::from_reviews(product_id, &reviews).average_hundredths,
        413
    );
}

#[tokio::test]
async fn second_review_by_the_same_customer_conflicts() {
    let ctx = tenant(Role::Staff);
    let product_id = ProductId::random();
    let existing = approved(product_id, 5, now());
    let customer_id = existing.customer_id();

    let mut reviews = MockReviewRepository::new();
    reviews
        .expect_find_by_author()
        .withf(move |_, product, customer| *product == product_id && *customer == customer_id)
        .return_once(move |_, _, _| Ok(Some(existing)));
    let service = ReviewsService::new(
        Arc::new(reviews),
        Arc::new(MockOrderRepository::new()),
        ReviewPolicy::default(),
        fixed_clock(now()),
    );
    let err = service
        .submit(
            &ctx,
            SubmitReviewRequest {
                product_id,
                customer_id,
                rating: Rating::new(3).expect("rating"),
                title: "again".to_owned(),
                body: String::new(),
            },
        )
        .await
        .expect_err("duplicate");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.details().expect("details")["code"], "duplicate_review");
}

#[tokio::test]
async fn verified_purchases_are_auto_approved() {
    let ctx = tenant(Role::Staff);
    let mut reviews = MockReviewRepository::new();
    reviews
        .expect_find_by_author()
        .return_once(|_, _, _| Ok(None));
    reviews
        .expect_save()
        .withf(|_, review, expected| {
            review.status() == ReviewStatus::Approved && expected.is_none()
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));
    let mut orders = MockOrderRepository::new();
    orders
        .expect_customer_purchased_product()
        .return_once(|_, _, _| Ok(true));

    let service = ReviewsService::new(
        Arc::new(reviews),
        Arc::new(orders),
        ReviewPolicy {
            auto_approve_verified: true,
        },
        fixed_clock(now()),
    );
    let review = service
        .submit(
            &ctx,
            SubmitReviewRequest {
                product_id: ProductId::random(),
                customer_id: CustomerId::random(),
                rating: Rating::new(5).expect("rating"),
                title: "Lovely mug".to_owned(),
                body: "Keeps tea warm.".to_owned(),
            },
        )
        .await
        .expect("submit");
    assert!(review.verified_purchase());
}

#[tokio::test]
async fn list_pages_approved_reviews_newest_first() {
    let ctx = tenant(Role::Viewer);
    let product_id = ProductId::random();
    let oldest = approved(product_id, 3, now());
    let middle = approved(product_id, 4, now() + TimeDelta::days(1));
    let newest = approved(product_id, 5, now() + TimeDelta::days(2));
    let hidden = Review::submit(
        ReviewId::random(),
        draft(1, "pending"),
        false,
        &ReviewPolicy::default(),
        now() + TimeDelta::days(3),
    )
    .expect("pending");
    let stored = vec![oldest.clone(), hidden, newest.clone(), middle.clone()];

    let mut reviews = MockReviewRepository::new();
    reviews
        .expect_list_for_product()
        .times(2)
        .returning(move |_, _| Ok(stored.clone()));
    let service = ReviewsService::new(
        Arc::new(reviews),
        Arc::new(MockOrderRepository::new()),
        ReviewPolicy::default(),
        fixed_clock(now()),
    );

    let first = service
        .list(
            &ctx,
            product_id,
            PageParams {
                cursor: None,
                limit: Some(2),
            },
        )
        .await
        .expect("first page");
    assert_eq!(first.items, vec![newest, middle]);

    let second = service
        .list(
            &ctx,
            product_id,
            PageParams {
                cursor: first.next_cursor,
                limit: Some(2),
            },
        )
        .await
        .expect("second page");
    assert_eq!(second.items, vec![oldest]);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn staff_cannot_moderate() {
    let ctx = tenant(Role::Staff);
    let service = ReviewsService::new(
        Arc::new(MockReviewRepository::new()),
        Arc::new(MockOrderRepository::new()),
        ReviewPolicy::default(),
        fixed_clock(now()),
    );
    let err = service
        .moderate(&ctx, ReviewId::random(), ModerationDecision::Approve)
        .await
        .expect_err("forbidden");
    assert_eq!(err.code(), ErrorCode::Forbidden);
}
