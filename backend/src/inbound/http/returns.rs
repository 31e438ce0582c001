//! Returns workflow handlers.
//!
//! ```text
//! POST /api/v1/returns
//! GET  /api/v1/returns/{id}
//! GET  /api/v1/orders/{orderId}/returns
//! POST /api/v1/returns/{id}/approve
//! POST /api/v1/returns/{id}/reject
//! POST /api/v1/returns/{id}/cancel
//! POST /api/v1/returns/{id}/receive
//! POST /api/v1/returns/{id}/refund
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::OpenReturnRequest;
use crate::domain::{
    Error, ItemCondition, OrderId, ReceivedLine, RefundBreakdown, ReturnId, ReturnLine,
    ReturnLineRequest, ReturnReason, ReturnRequest, ReturnStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::MoneyBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_required_id};

const RETURN_ID: FieldName = FieldName::new("returnId");
const ORDER_ID: FieldName = FieldName::new("orderId");
const ORDER_LINE_ID: FieldName = FieldName::new("orderLineId");

/// One line of a return as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineResponse {
    /// Order line being returned.
    pub order_line_id: String,
    /// Product on that line.
    pub product_id: String,
    /// Units coming back.
    pub quantity: u32,
    /// Price paid per unit.
    pub unit_price: MoneyBody,
    /// Why the customer is returning it.
    #[schema(value_type = String, example = "damaged")]
    pub reason: ReturnReason,
    /// Condition recorded on receipt.
    #[schema(value_type = Option<String>, example = "resellable")]
    pub condition: Option<ItemCondition>,
}

impl From<&ReturnLine> for ReturnLineResponse {
    fn from(value: &ReturnLine) -> Self {
        Self {
            order_line_id: value.order_line_id.to_string(),
            product_id: value.product_id.to_string(),
            quantity: value.quantity,
            unit_price: value.unit_price.into(),
            reason: value.reason,
            condition: value.condition,
        }
    }
}

/// Refund computed for a received return.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    /// Value of the returned units before fees.
    pub subtotal: MoneyBody,
    /// Fee withheld for non-resellable units.
    pub restocking_fee: MoneyBody,
    /// Amount paid back to the customer.
    pub total: MoneyBody,
}

impl From<RefundBreakdown> for RefundResponse {
    fn from(value: RefundBreakdown) -> Self {
        Self {
            subtotal: value.subtotal.into(),
            restocking_fee: value.restocking_fee.into(),
            total: value.total.into(),
        }
    }
}

/// Return request as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnResponse {
    /// Return identifier.
    pub id: String,
    /// Order the goods were bought on.
    pub order_id: String,
    /// Customer who opened the return.
    pub customer_id: String,
    /// Lifecycle state.
    #[schema(value_type = String, example = "requested")]
    pub status: ReturnStatus,
    /// Lines being sent back.
    pub lines: Vec<ReturnLineResponse>,
    /// When the return was opened.
    pub requested_at: DateTime<Utc>,
    /// When it was approved or rejected.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the goods arrived.
    pub received_at: Option<DateTime<Utc>>,
    /// When the refund was issued.
    pub refunded_at: Option<DateTime<Utc>>,
    /// Rejection reason, if any.
    pub note: Option<String>,
    /// Refund breakdown once received.
    pub refund: Option<RefundResponse>,
}

impl From<ReturnRequest> for ReturnResponse {
    fn from(value: ReturnRequest) -> Self {
        Self {
            id: value.id().to_string(),
            order_id: value.order_id().to_string(),
            customer_id: value.customer_id().to_string(),
            status: value.status(),
            lines: value.lines().iter().map(ReturnLineResponse::from).collect(),
            requested_at: value.requested_at(),
            decided_at: value.decided_at(),
            received_at: value.received_at(),
            refunded_at: value.refunded_at(),
            note: value.note().map(str::to_owned),
            refund: value.refund_breakdown().map(RefundResponse::from),
        }
    }
}

/// A line the customer wants to send back.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineBody {
    pub order_line_id: Option<String>,
    pub quantity: u32,
    #[schema(value_type = String, example = "changed_mind")]
    pub reason: ReturnReason,
}

/// Request payload for filing a return.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenReturnBody {
    pub order_id: Option<String>,
    pub lines: Vec<ReturnLineBody>,
}

/// Request payload for rejecting a return.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody {
    pub note: Option<String>,
}

/// Condition of one received line.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedLineBody {
    pub order_line_id: Option<String>,
    #[schema(value_type = String, example = "resellable")]
    pub condition: ItemCondition,
}

/// Request payload for booking in returned goods.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveBody {
    pub lines: Vec<ReceivedLineBody>,
}

/// Returns filed against an order.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnListResponse {
    pub returns: Vec<ReturnResponse>,
}

fn return_id(path: &str) -> Result<ReturnId, Error> {
    parse_id(path, RETURN_ID)
}

/// File a return against a fulfilled order.
#[utoipa::path(
    post,
    path = "/api/v1/returns",
    request_body = OpenReturnBody,
    responses(
        (status = 201, description = "Return filed", body = ReturnResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Order not found", body = ErrorSchema),
        (status = 409, description = "Order not returnable", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "openReturn"
)]
#[post("/returns")]
pub async fn open_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<OpenReturnBody>,
) -> ApiResult<HttpResponse> {
    let ctx = session.require_tenant()?;
    let OpenReturnBody { order_id, lines } = payload.into_inner();
    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(ReturnLineRequest {
                order_line_id: parse_required_id(line.order_line_id, ORDER_LINE_ID)?,
                quantity: line.quantity,
                reason: line.reason,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let request = OpenReturnRequest {
        order_id: parse_required_id(order_id, ORDER_ID)?,
        lines,
    };
    let opened = state.returns.open(&ctx, request).await?;
    Ok(HttpResponse::Created().json(ReturnResponse::from(opened)))
}

/// Read a return.
#[utoipa::path(
    get,
    path = "/api/v1/returns/{id}",
    params(("id" = String, Path, description = "Return identifier")),
    responses(
        (status = 200, description = "Return", body = ReturnResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "getReturn"
)]
#[get("/returns/{id}")]
pub async fn get_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let found = state.returns.get(&ctx, return_id(&path)?).await?;
    Ok(web::Json(found.into()))
}

/// List every return filed against an order.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{orderId}/returns",
    params(("orderId" = String, Path, description = "Order identifier")),
    responses(
        (status = 200, description = "Returns for the order", body = ReturnListResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "listOrderReturns"
)]
#[get("/orders/{order_id}/returns")]
pub async fn list_order_returns(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReturnListResponse>> {
    let ctx = session.require_tenant()?;
    let order_id: OrderId = parse_id(&path, ORDER_ID)?;
    let returns = state.returns.list_for_order(&ctx, order_id).await?;
    Ok(web::Json(ReturnListResponse {
        returns: returns.into_iter().map(ReturnResponse::from).collect(),
    }))
}

/// Accept a pending return.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/approve",
    params(("id" = String, Path, description = "Return identifier")),
    responses(
        (status = 200, description = "Approved", body = ReturnResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "approveReturn"
)]
#[post("/returns/{id}/approve")]
pub async fn approve_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let approved = state.returns.approve(&ctx, return_id(&path)?).await?;
    Ok(web::Json(approved.into()))
}

/// Decline a pending return.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/reject",
    params(("id" = String, Path, description = "Return identifier")),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Rejected", body = ReturnResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "rejectReturn"
)]
#[post("/returns/{id}/reject")]
pub async fn reject_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectBody>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let rejected = state
        .returns
        .reject(&ctx, return_id(&path)?, payload.into_inner().note)
        .await?;
    Ok(web::Json(rejected.into()))
}

/// Withdraw a return before the goods arrive.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/cancel",
    params(("id" = String, Path, description = "Return identifier")),
    responses(
        (status = 200, description = "Cancelled", body = ReturnResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "cancelReturn"
)]
#[post("/returns/{id}/cancel")]
pub async fn cancel_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let cancelled = state.returns.cancel(&ctx, return_id(&path)?).await?;
    Ok(web::Json(cancelled.into()))
}

/// Book in returned goods and restock resellable units.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/receive",
    params(("id" = String, Path, description = "Return identifier")),
    request_body = ReceiveBody,
    responses(
        (status = 200, description = "Received", body = ReturnResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "receiveReturn"
)]
#[post("/returns/{id}/receive")]
pub async fn receive_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ReceiveBody>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let id = return_id(&path)?;
    let lines = payload
        .into_inner()
        .lines
        .into_iter()
        .map(|line| {
            Ok(ReceivedLine {
                order_line_id: parse_required_id(line.order_line_id, ORDER_LINE_ID)?,
                condition: line.condition,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let received = state.returns.receive(&ctx, id, lines).await?;
    Ok(web::Json(received.into()))
}

/// Refund a received return against its order.
#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/refund",
    params(("id" = String, Path, description = "Return identifier")),
    responses(
        (status = 200, description = "Refunded", body = ReturnResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Invalid transition", body = ErrorSchema)
    ),
    tags = ["returns"],
    operation_id = "refundReturn"
)]
#[post("/returns/{id}/refund")]
pub async fn refund_return(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReturnResponse>> {
    let ctx = session.require_tenant()?;
    let refunded = state.returns.refund(&ctx, return_id(&path)?).await?;
    Ok(web::Json(refunded.into()))
}
