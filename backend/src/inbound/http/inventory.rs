//! Stock lookup handlers.
//!
//! ```text
//! GET /api/v1/inventory/low-stock
//! GET /api/v1/inventory/{productId}
//! ```

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ProductId, StockLevel};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::MoneyBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const PRODUCT_ID: FieldName = FieldName::new("productId");

/// Stock position of one product.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelResponse {
    /// Product the level belongs to.
    pub product_id: String,
    /// Units physically in stock.
    pub on_hand: i64,
    /// Units held for open orders.
    pub reserved: i64,
    /// On hand minus reserved.
    pub available: i64,
    /// Availability at or below which the product counts as low.
    pub reorder_point: i64,
    /// Availability has fallen to the reorder point.
    pub low_stock: bool,
    /// Weighted average cost of units received so far.
    pub average_unit_cost: Option<MoneyBody>,
}

impl From<StockLevel> for StockLevelResponse {
    fn from(value: StockLevel) -> Self {
        Self {
            product_id: value.product_id().to_string(),
            on_hand: value.on_hand(),
            reserved: value.reserved(),
            available: value.available(),
            reorder_point: value.reorder_point(),
            low_stock: value.is_low_stock(),
            average_unit_cost: value.average_unit_cost().map(MoneyBody::from),
        }
    }
}

/// Products at or below their reorder point.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LowStockResponse {
    pub items: Vec<StockLevelResponse>,
}

/// List products that need reordering, lowest availability first.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    responses(
        (status = 200, description = "Low stock products", body = LowStockResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["inventory"],
    operation_id = "listLowStock"
)]
#[get("/inventory/low-stock")]
pub async fn list_low_stock(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<LowStockResponse>> {
    let ctx = session.require_tenant()?;
    let levels = state.inventory.list_low_stock(&ctx).await?;
    Ok(web::Json(LowStockResponse {
        items: levels.into_iter().map(StockLevelResponse::from).collect(),
    }))
}

/// Read the stock of one product.
#[utoipa::path(
    get,
    path = "/api/v1/inventory/{productId}",
    params(("productId" = String, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Stock level", body = StockLevelResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["inventory"],
    operation_id = "getStockLevel"
)]
#[get("/inventory/{product_id}")]
pub async fn get_stock(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<StockLevelResponse>> {
    let ctx = session.require_tenant()?;
    let product_id: ProductId = parse_id(&path, PRODUCT_ID)?;
    let level = state.inventory.get_stock(&ctx, product_id).await?;
    Ok(web::Json(level.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    use super::*;
    use crate::domain::Role;
    use crate::domain::ports::MockInventoryQuery;
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::{login_cookie, mock_ports, test_app};

    const PRODUCT: &str = "3c1d2e4f-5a6b-4c7d-8e9f-0a1b2c3d4e5f";

    fn ports_with(inventory: MockInventoryQuery) -> HttpStatePorts {
        HttpStatePorts {
            inventory: Arc::new(inventory),
            ..mock_ports()
        }
    }

    #[actix_web::test]
    async fn low_stock_route_is_not_shadowed_by_product_lookup() {
        let mut inventory = MockInventoryQuery::new();
        inventory.expect_list_low_stock().times(1).returning(|_| {
            let product = PRODUCT.parse().expect("product");
            Ok(vec![StockLevel::empty(product).with_reorder_point(5)])
        });
        let app = actix_test::init_service(test_app(ports_with(inventory))).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/inventory/low-stock")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["items"][0]["productId"], PRODUCT);
        assert_eq!(body["items"][0]["lowStock"], true);
    }

    #[actix_web::test]
    async fn get_stock_reports_available_units() {
        let mut inventory = MockInventoryQuery::new();
        inventory
            .expect_get_stock()
            .withf(|_, product| product.to_string() == PRODUCT)
            .times(1)
            .returning(|_, product| Ok(StockLevel::empty(product).with_reserved(2)));
        let app = actix_test::init_service(test_app(ports_with(inventory))).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/inventory/{PRODUCT}"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["reserved"], 2);
        assert_eq!(body["available"], -2);
        assert!(body["averageUnitCost"].is_null());
    }
}
