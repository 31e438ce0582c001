//! Supplier purchase order handlers.
//!
//! ```text
//! POST /api/v1/purchase-orders
//! GET  /api/v1/purchase-orders/{id}
//! POST /api/v1/purchase-orders/{id}/submit
//! POST /api/v1/purchase-orders/{id}/receive
//! POST /api/v1/purchase-orders/{id}/cancel
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::CreatePurchaseOrderRequest;
use crate::domain::{
    Error, LineReceipt, PurchaseOrder, PurchaseOrderId, PurchaseOrderLine,
    PurchaseOrderLineDraft, PurchaseOrderStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::MoneyBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_optional_rfc3339_timestamp, parse_required_id,
};

const PURCHASE_ORDER_ID: FieldName = FieldName::new("purchaseOrderId");
const PRODUCT_ID: FieldName = FieldName::new("productId");
const LINE_ID: FieldName = FieldName::new("lineId");
const EXPECTED_AT: FieldName = FieldName::new("expectedAt");

/// One line of a purchase order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineResponse {
    pub id: String,
    pub product_id: String,
    pub ordered: u32,
    pub received: u32,
    pub outstanding: u32,
    pub unit_cost: MoneyBody,
}

impl From<&PurchaseOrderLine> for PurchaseOrderLineResponse {
    fn from(value: &PurchaseOrderLine) -> Self {
        Self {
            id: value.id.to_string(),
            product_id: value.product_id.to_string(),
            ordered: value.ordered,
            received: value.received,
            outstanding: value.outstanding(),
            unit_cost: value.unit_cost.into(),
        }
    }
}

/// Purchase order as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderResponse {
    /// Purchase order identifier.
    pub id: String,
    /// Supplier name.
    pub supplier: String,
    /// draft, ordered, partially_received, received or cancelled.
    #[schema(value_type = String, example = "ordered")]
    pub status: PurchaseOrderStatus,
    /// Ordered products with received quantities.
    pub lines: Vec<PurchaseOrderLineResponse>,
    /// Sum of ordered quantity times unit cost.
    pub total_cost: Option<MoneyBody>,
    /// Expected delivery time.
    pub expected_at: Option<DateTime<Utc>>,
    /// When the order was sent to the supplier.
    pub submitted_at: Option<DateTime<Utc>>,
    /// When the last line was fully received.
    pub received_at: Option<DateTime<Utc>>,
}

impl From<PurchaseOrder> for PurchaseOrderResponse {
    fn from(value: PurchaseOrder) -> Self {
        Self {
            id: value.id().to_string(),
            supplier: value.supplier().to_owned(),
            status: value.status(),
            lines: value
                .lines()
                .iter()
                .map(PurchaseOrderLineResponse::from)
                .collect(),
            total_cost: value.total_cost().ok().map(MoneyBody::from),
            expected_at: value.expected_at(),
            submitted_at: value.submitted_at(),
            received_at: value.received_at(),
        }
    }
}

/// A product to order.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderLineBody {
    pub product_id: Option<String>,
    pub quantity: u32,
    pub unit_cost: MoneyBody,
}

/// Request payload for raising a purchase order.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderBody {
    /// Supplier name.
    #[schema(example = "Acme Ceramics")]
    pub supplier: String,
    /// At least one line.
    pub lines: Vec<PurchaseOrderLineBody>,
    /// RFC 3339 expected delivery time.
    pub expected_at: Option<String>,
}

/// Quantity arriving for one line.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineReceiptBody {
    pub line_id: Option<String>,
    pub quantity: u32,
}

/// Request payload for booking a delivery.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveDeliveryBody {
    pub receipts: Vec<LineReceiptBody>,
}

fn purchase_order_id(path: &str) -> Result<PurchaseOrderId, Error> {
    parse_id(path, PURCHASE_ORDER_ID)
}

/// Raise a draft purchase order.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderBody,
    responses(
        (status = 201, description = "Draft created", body = PurchaseOrderResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["purchasing"],
    operation_id = "createPurchaseOrder"
)]
#[post("/purchase-orders")]
pub async fn create_purchase_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreatePurchaseOrderBody>,
) -> ApiResult<HttpResponse> {
    let ctx = session.require_tenant()?;
    let CreatePurchaseOrderBody {
        supplier,
        lines,
        expected_at,
    } = payload.into_inner();
    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(PurchaseOrderLineDraft {
                product_id: parse_required_id(line.product_id, PRODUCT_ID)?,
                quantity: line.quantity,
                unit_cost: line.unit_cost.into_money("unitCost")?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let request = CreatePurchaseOrderRequest {
        supplier,
        lines,
        expected_at: parse_optional_rfc3339_timestamp(expected_at, EXPECTED_AT)?,
    };
    let order = state.purchasing.create(&ctx, request).await?;
    Ok(HttpResponse::Created().json(PurchaseOrderResponse::from(order)))
}

/// Read a purchase order.
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = String, Path, description = "Purchase order identifier")),
    responses(
        (status = 200, description = "Purchase order", body = PurchaseOrderResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["purchasing"],
    operation_id = "getPurchaseOrder"
)]
#[get("/purchase-orders/{id}")]
pub async fn get_purchase_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PurchaseOrderResponse>> {
    let ctx = session.require_tenant()?;
    let order = state.purchasing.get(&ctx, purchase_order_id(&path)?).await?;
    Ok(web::Json(order.into()))
}

/// Send a draft to the supplier.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/submit",
    params(("id" = String, Path, description = "Purchase order identifier")),
    responses(
        (status = 200, description = "Submitted", body = PurchaseOrderResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["purchasing"],
    operation_id = "submitPurchaseOrder"
)]
#[post("/purchase-orders/{id}/submit")]
pub async fn submit_purchase_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PurchaseOrderResponse>> {
    let ctx = session.require_tenant()?;
    let order = state.purchasing.submit(&ctx, purchase_order_id(&path)?).await?;
    Ok(web::Json(order.into()))
}

/// Book a delivery into stock.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(("id" = String, Path, description = "Purchase order identifier")),
    request_body = ReceiveDeliveryBody,
    responses(
        (status = 200, description = "Delivery booked", body = PurchaseOrderResponse),
        (status = 400, description = "Invalid request or over-receipt", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["purchasing"],
    operation_id = "receivePurchaseOrder"
)]
#[post("/purchase-orders/{id}/receive")]
pub async fn receive_purchase_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ReceiveDeliveryBody>,
) -> ApiResult<web::Json<PurchaseOrderResponse>> {
    let ctx = session.require_tenant()?;
    let id = purchase_order_id(&path)?;
    let receipts = payload
        .into_inner()
        .receipts
        .into_iter()
        .map(|receipt| {
            Ok(LineReceipt {
                line_id: parse_required_id(receipt.line_id, LINE_ID)?,
                quantity: receipt.quantity,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let order = state.purchasing.receive(&ctx, id, receipts).await?;
    Ok(web::Json(order.into()))
}

/// Abandon an order that has not started arriving.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    params(("id" = String, Path, description = "Purchase order identifier")),
    responses(
        (status = 200, description = "Cancelled", body = PurchaseOrderResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["purchasing"],
    operation_id = "cancelPurchaseOrder"
)]
#[post("/purchase-orders/{id}/cancel")]
pub async fn cancel_purchase_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PurchaseOrderResponse>> {
    let ctx = session.require_tenant()?;
    let order = state.purchasing.cancel(&ctx, purchase_order_id(&path)?).await?;
    Ok(web::Json(order.into()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::ports::MockPurchasingCommand;
    use crate::domain::test_support::at;
    use crate::domain::{Money, Role};
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::{error_codes, login_cookie, mock_ports, test_app};

    const PURCHASE_ORDER: &str = "2a3b4c5d-6e7f-4a8b-9c0d-1e2f3a4b5c6d";
    const PRODUCT: &str = "3c1d2e4f-5a6b-4c7d-8e9f-0a1b2c3d4e5f";

    fn draft_order() -> PurchaseOrder {
        PurchaseOrder::create(
            PURCHASE_ORDER.parse().expect("id"),
            "Acme Ceramics",
            vec![PurchaseOrderLineDraft {
                product_id: PRODUCT.parse().expect("product"),
                quantity: 10,
                unit_cost: Money::parse(450, "USD").expect("money"),
            }],
            None,
            at(2024, 4, 1),
        )
        .expect("purchase order")
    }

    fn ports_with(purchasing: MockPurchasingCommand) -> HttpStatePorts {
        HttpStatePorts {
            purchasing: Arc::new(purchasing),
            ..mock_ports()
        }
    }

    #[actix_web::test]
    async fn create_parses_lines_and_expected_date() {
        let mut purchasing = MockPurchasingCommand::new();
        purchasing
            .expect_create()
            .withf(|_, request| {
                request.supplier == "Acme Ceramics"
                    && request.lines.len() == 1
                    && request.expected_at.is_some()
            })
            .times(1)
            .returning(|_, _| Ok(draft_order()));
        let app = actix_test::init_service(test_app(ports_with(purchasing))).await;
        let cookie = login_cookie(&app, Role::Manager).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/purchase-orders")
                .cookie(cookie)
                .set_json(json!({
                    "supplier": "Acme Ceramics",
                    "lines": [{
                        "productId": PRODUCT,
                        "quantity": 10,
                        "unitCost": { "amountMinor": 450, "currency": "USD" }
                    }],
                    "expectedAt": "2024-04-10T09:00:00Z"
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["status"], "draft");
        assert_eq!(body["lines"][0]["outstanding"], 10);
        assert_eq!(body["totalCost"]["amountMinor"], 4_500);
    }

    #[actix_web::test]
    async fn create_rejects_bad_expected_date() {
        let app = actix_test::init_service(test_app(mock_ports())).await;
        let cookie = login_cookie(&app, Role::Manager).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/purchase-orders")
                .cookie(cookie)
                .set_json(json!({
                    "supplier": "Acme Ceramics",
                    "lines": [],
                    "expectedAt": "next week"
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let (_, detail) = error_codes(res).await;
        assert_eq!(detail.as_deref(), Some("invalid_timestamp"));
    }

    #[actix_web::test]
    async fn receive_maps_receipts() {
        let mut purchasing = MockPurchasingCommand::new();
        purchasing
            .expect_receive()
            .withf(|_, id, receipts| {
                id.to_string() == PURCHASE_ORDER
                    && receipts.len() == 1
                    && receipts[0].quantity == 4
            })
            .times(1)
            .returning(|_, _, _| Ok(draft_order()));
        let app = actix_test::init_service(test_app(ports_with(purchasing))).await;
        let cookie = login_cookie(&app, Role::Staff).await;
        let line_id = draft_order().lines()[0].id.to_string();

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/purchase-orders/{PURCHASE_ORDER}/receive"))
                .cookie(cookie)
                .set_json(json!({ "receipts": [{ "lineId": line_id, "quantity": 4 }] }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
    }
}
