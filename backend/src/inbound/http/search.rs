//! Catalogue search handler.
//!
//! ```text
//! GET /api/v1/products/search?q=mug&cursor=...&limit=20
//! ```

use actix_web::{HttpRequest, get, web};
use pagination::PageParams;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::SearchHit;
use crate::domain::ports::ProductSearchRequest;
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{LinksBody, MoneyBody, page_links};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query parameters for product search.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Free-text query; blank returns an empty page.
    #[serde(default)]
    pub q: String,
    /// Token from a previous page's `nextCursor`.
    pub cursor: Option<String>,
    /// Page size, 1 to 100; defaults to 20.
    pub limit: Option<usize>,
}

/// A ranked catalogue match.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitResponse {
    /// Product identifier.
    pub id: String,
    /// Product name.
    pub name: String,
    /// Stock keeping unit.
    pub sku: String,
    /// Product description.
    pub description: String,
    /// Product tags.
    pub tags: Vec<String>,
    /// List price.
    pub price: MoneyBody,
    /// Relevance; higher ranks first.
    pub score: u32,
}

impl From<SearchHit> for SearchHitResponse {
    fn from(value: SearchHit) -> Self {
        let product = value.product;
        Self {
            id: product.id.to_string(),
            name: product.name,
            sku: product.sku,
            description: product.description,
            tags: product.tags,
            price: product.price.into(),
            score: value.score,
        }
    }
}

/// One page of search results.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchPageResponse {
    pub items: Vec<SearchHitResponse>,
    pub limit: usize,
    pub next_cursor: Option<String>,
    pub links: LinksBody,
}

/// Search active products by keyword.
#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Ranked matches", body = SearchPageResponse),
        (status = 400, description = "Invalid cursor or limit", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["search"],
    operation_id = "searchProducts"
)]
#[get("/products/search")]
pub async fn search_products(
    req: HttpRequest,
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SearchQuery>,
) -> ApiResult<web::Json<SearchPageResponse>> {
    let ctx = session.require_tenant()?;
    let SearchQuery { q, cursor, limit } = query.into_inner();
    let request = ProductSearchRequest {
        query: q,
        page: PageParams { cursor, limit },
    };
    let page = state.search.search(&ctx, request).await?;
    let links = page_links(&req, page.limit, page.next_cursor.as_deref())?;
    Ok(web::Json(SearchPageResponse {
        limit: page.limit,
        next_cursor: page.next_cursor,
        items: page.items.into_iter().map(SearchHitResponse::from).collect(),
        links,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use pagination::Page;
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::MockProductSearchQuery;
    use crate::domain::{Error, Money, ProductId, ProductSummary, Role};
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::{error_codes, login_cookie, mock_ports, test_app};

    fn ports_with(search: MockProductSearchQuery) -> HttpStatePorts {
        HttpStatePorts {
            search: Arc::new(search),
            ..mock_ports()
        }
    }

    fn hit() -> SearchHit {
        SearchHit {
            product: ProductSummary {
                id: ProductId::random(),
                name: "Blue Mug".to_owned(),
                sku: "MUG-BLU".to_owned(),
                description: "Stoneware".to_owned(),
                tags: vec!["kitchen".to_owned()],
                price: Money::parse(1_200, "USD").expect("money"),
                active: true,
            },
            score: 15,
        }
    }

    #[actix_web::test]
    async fn search_is_not_captured_by_review_routes() {
        let mut search = MockProductSearchQuery::new();
        search
            .expect_search()
            .withf(|_, request| request.query == "blue mug" && request.page.limit == Some(10))
            .times(1)
            .returning(|_, _| {
                Ok(Page {
                    items: vec![hit()],
                    limit: 10,
                    next_cursor: None,
                })
            });
        let app = actix_test::init_service(test_app(ports_with(search))).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/products/search?q=blue%20mug&limit=10")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["items"][0]["sku"], "MUG-BLU");
        assert_eq!(body["items"][0]["score"], 15);
        assert!(body["links"]["next"].is_null());
        assert!(body["nextCursor"].is_null());
    }

    #[actix_web::test]
    async fn invalid_cursor_is_a_client_error() {
        let mut search = MockProductSearchQuery::new();
        search.expect_search().times(1).returning(|_, _| {
            Err(Error::invalid_request("invalid cursor")
                .with_details(serde_json::json!({ "code": "invalid_cursor" })))
        });
        let app = actix_test::init_service(test_app(ports_with(search))).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/products/search?q=mug&cursor=garbage")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let (code, detail) = error_codes(res).await;
        assert_eq!(code, "invalid_request");
        assert_eq!(detail.as_deref(), Some("invalid_cursor"));
    }
}
