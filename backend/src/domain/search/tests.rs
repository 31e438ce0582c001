//! Tokenising, scoring, ranking, and paging search results.

use std::sync::Arc;

use pagination::PageParams;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::orders::test_support::usd;
use crate::domain::ports::{MockProductCatalogue, ProductSearchQuery, ProductSearchRequest};
use crate::domain::test_support::tenant;
use crate::domain::{ErrorCode, Role};

fn product(name: &str, sku: &str, description: &str, tags: &[&str]) -> ProductSummary {
    ProductSummary {
        id: ProductId::random(),
        name: name.to_owned(),
        sku: sku.to_owned(),
        description: description.to_owned(),
        tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        price: usd(1_500),
        active: true,
    }
}

#[fixture]
fn mug() -> ProductSummary {
    product(
        "Blue Ceramic Mug",
        "MUG-001",
        "A sturdy blue mug for coffee",
        &["Kitchen", "gift"],
    )
}

fn scored(product: &ProductSummary, query: &str) -> Option<u32> {
    score(product, query, &tokenize(query))
}

#[rstest]
#[case::name_word("mug", Some(NAME_WORD_SCORE + DESCRIPTION_WORD_SCORE))]
#[case::name_prefix("cera", Some(NAME_PREFIX_SCORE))]
#[case::tag_is_case_insensitive("KITCHEN", Some(TAG_SCORE))]
#[case::description_only("coffee", Some(DESCRIPTION_WORD_SCORE))]
#[case::two_tokens("blue gift", Some(NAME_WORD_SCORE + DESCRIPTION_WORD_SCORE + TAG_SCORE))]
#[case::one_token_misses("blue teapot", None)]
#[case::sku_exact(
    "mug-001",
    Some(SKU_MATCH_SCORE + NAME_WORD_SCORE + DESCRIPTION_WORD_SCORE)
)]
fn scores_each_kind_of_match(
    mug: ProductSummary,
    #[case] query: &str,
    #[case] expected: Option<u32>,
) {
    assert_eq!(scored(&mug, query), expected);
}

#[test]
fn sku_match_excuses_unmatched_tokens() {
    let item = product("Teapot", "TP-9", "", &[]);
    // "tp" and "9" match nothing in the name, but the SKU matches exactly.
    assert_eq!(scored(&item, "tp-9"), Some(SKU_MATCH_SCORE));
}

#[rstest]
fn inactive_products_are_hidden(mut mug: ProductSummary) {
    mug.active = false;
    assert_eq!(scored(&mug, "mug"), None);
}

#[test]
fn ranking_breaks_ties_by_name() {
    let zebra = product("Zebra mug", "Z", "", &[]);
    let apple = product("apple mug", "A", "", &[]);
    let best = product("Mug", "M", "mug", &[]);
    let hits = rank(vec![zebra, apple, best], "mug", &tokenize("mug"));
    let names: Vec<&str> = hits.iter().map(|hit| hit.product.name.as_str()).collect();
    assert_eq!(names, vec!["Mug", "apple mug", "Zebra mug"]);
}

#[tokio::test]
async fn blank_queries_are_rejected() {
    let service = ProductSearchService::new(Arc::new(MockProductCatalogue::new()));
    let err = service
        .search(
            &tenant(Role::Viewer),
            ProductSearchRequest {
                query: " ?! ".to_owned(),
                page: PageParams::default(),
            },
        )
        .await
        .expect_err("blank");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.details().expect("details")["field"], "query");
}

#[tokio::test]
async fn results_are_paged_with_an_opaque_cursor() {
    let products: Vec<ProductSummary> = (0..5)
        .map(|n| product(&format!("Mug {n}"), &format!("M{n}"), "", &[]))
        .collect();
    let mut catalogue = MockProductCatalogue::new();
    catalogue
        .expect_list_products()
        .times(2)
        .returning(move |_| Ok(products.clone()));
    let service = ProductSearchService::new(Arc::new(catalogue));
    let ctx = tenant(Role::Staff);

    let first = service
        .search(
            &ctx,
            ProductSearchRequest {
                query: "mug".to_owned(),
                page: PageParams {
                    cursor: None,
                    limit: Some(3),
                },
            },
        )
        .await
        .expect("first page");
    assert_eq!(first.items.len(), 3);
    assert!(first.next_cursor.is_some());

    let second = service
        .search(
            &ctx,
            ProductSearchRequest {
                query: "mug".to_owned(),
                page: PageParams {
                    cursor: first.next_cursor.clone(),
                    limit: Some(3),
                },
            },
        )
        .await
        .expect("second page");
    let names: Vec<String> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|hit| hit.product.name.clone())
        .collect();
    assert_eq!(names, vec!["Mug 0", "Mug 1", "Mug 2", "Mug 3", "Mug 4"]);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn oversized_limits_are_rejected() {
    let service = ProductSearchService::new(Arc::new(MockProductCatalogue::new()));
    let err = service
        .search(
            &tenant(Role::Viewer),
            ProductSearchRequest {
                query: "mug".to_owned(),
                page: PageParams {
                    cursor: None,
                    limit: Some(101),
                },
            },
        )
        .await
        .expect_err("too large");
    assert_eq!(err.details().expect("details")["field"], "limit");
}
