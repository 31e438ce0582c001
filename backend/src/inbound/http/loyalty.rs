//! Loyalty account handlers.
//!
//! ```text
//! GET  /api/v1/customers/{customerId}/loyalty
//! POST /api/v1/customers/{customerId}/loyalty/earn
//! POST /api/v1/customers/{customerId}/loyalty/redeem
//! POST /api/v1/customers/{customerId}/loyalty/adjust
//! POST /api/v1/customers/{customerId}/loyalty/reverse
//! ```

use actix_web::{get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    AdjustPointsRequest, EarnPointsRequest, LoyaltyAccountView, RedeemOutcome,
    RedeemPointsRequest, ReverseOrderPointsRequest,
};
use crate::domain::{
    CurrencyCode, CustomerId, EarnOutcome, Error, LedgerEntry, LedgerKind, LoyaltyTier,
    ReverseOutcome,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::MoneyBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_required_id};

const CUSTOMER_ID: FieldName = FieldName::new("customerId");
const ORDER_ID: FieldName = FieldName::new("orderId");

/// One movement in the points ledger.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    /// Movement kind: earn, redeem, adjust or reverse.
    #[schema(value_type = String, example = "earn")]
    pub kind: LedgerKind,
    /// Signed point change.
    pub points: i64,
    /// Order that caused the movement.
    pub order_id: Option<String>,
    /// Reason given for a manual adjustment.
    pub reason: Option<String>,
    /// When the movement was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for LedgerEntryResponse {
    fn from(value: &LedgerEntry) -> Self {
        Self {
            kind: value.kind,
            points: value.points,
            order_id: value.order_id.map(|id| id.to_string()),
            reason: value.reason.clone(),
            recorded_at: value.recorded_at,
        }
    }
}

/// Loyalty account with progress towards the next tier.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyAccountResponse {
    /// Account holder.
    pub customer_id: String,
    /// Points available to redeem.
    pub balance: u64,
    /// Points ever earned; drives the tier.
    pub lifetime_points: u64,
    /// Current tier.
    #[schema(value_type = String, example = "silver")]
    pub tier: LoyaltyTier,
    /// Tier reached next; absent at the top tier.
    #[schema(value_type = Option<String>, example = "gold")]
    pub next_tier: Option<LoyaltyTier>,
    /// Lifetime points still needed; absent at the top tier.
    pub points_to_next_tier: Option<u64>,
    /// Every balance change, oldest first.
    pub ledger: Vec<LedgerEntryResponse>,
}

impl From<LoyaltyAccountView> for LoyaltyAccountResponse {
    fn from(value: LoyaltyAccountView) -> Self {
        let account = value.account;
        Self {
            customer_id: account.customer_id().to_string(),
            balance: account.balance(),
            lifetime_points: account.lifetime_points(),
            tier: account.tier(),
            next_tier: value.next_tier,
            points_to_next_tier: value.points_to_next_tier,
            ledger: account.ledger().iter().map(LedgerEntryResponse::from).collect(),
        }
    }
}

/// Request payload for awarding points for a paid order.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarnRequest {
    pub order_id: Option<String>,
    pub order_total: MoneyBody,
}

/// Points awarded and the resulting tier.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EarnResponse {
    pub points: u64,
    pub balance: u64,
    #[schema(value_type = String)]
    pub previous_tier: LoyaltyTier,
    #[schema(value_type = String)]
    pub tier: LoyaltyTier,
    pub tier_changed: bool,
}

impl From<EarnOutcome> for EarnResponse {
    fn from(value: EarnOutcome) -> Self {
        Self {
            tier_changed: value.tier_changed(),
            points: value.points,
            balance: value.balance,
            previous_tier: value.previous_tier,
            tier: value.tier,
        }
    }
}

/// Request payload for spending points.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    /// Points to spend; at most the balance.
    pub points: u64,
    /// Currency the discount is expressed in.
    #[schema(example = "USD")]
    pub currency: String,
}

/// Discount granted for redeemed points.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub discount: MoneyBody,
    pub balance: u64,
}

impl From<RedeemOutcome> for RedeemResponse {
    fn from(value: RedeemOutcome) -> Self {
        Self {
            discount: value.discount.into(),
            balance: value.balance,
        }
    }
}

/// Request payload for a manual balance correction.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustRequest {
    /// Signed point change.
    pub delta: i64,
    /// Why the balance was corrected.
    pub reason: String,
}

/// Request payload for undoing an order's award.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    pub order_id: Option<String>,
}

/// Points removed by a reversal.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseResponse {
    pub points_removed: u64,
    pub balance: u64,
    #[schema(value_type = String)]
    pub previous_tier: LoyaltyTier,
    #[schema(value_type = String)]
    pub tier: LoyaltyTier,
}

impl From<ReverseOutcome> for ReverseResponse {
    fn from(value: ReverseOutcome) -> Self {
        Self {
            points_removed: value.points_removed,
            balance: value.balance,
            previous_tier: value.previous_tier,
            tier: value.tier,
        }
    }
}

fn parse_currency(value: &str) -> Result<CurrencyCode, Error> {
    value.parse().map_err(|err| {
        Error::invalid_request(format!("currency: {err}")).with_details(serde_json::json!({
            "field": "currency",
            "value": value,
            "code": "invalid_currency",
        }))
    })
}

/// Fetch a customer's loyalty account, creating an empty one lazily.
#[utoipa::path(
    get,
    path = "/api/v1/customers/{customerId}/loyalty",
    params(("customerId" = String, Path, description = "Customer identifier")),
    responses(
        (status = 200, description = "Loyalty account", body = LoyaltyAccountResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["loyalty"],
    operation_id = "getLoyaltyAccount"
)]
#[get("/customers/{customer_id}/loyalty")]
pub async fn get_account(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<LoyaltyAccountResponse>> {
    let ctx = session.require_tenant()?;
    let customer_id: CustomerId = parse_id(&path, CUSTOMER_ID)?;
    let view = state.loyalty.get_account(&ctx, customer_id).await?;
    Ok(web::Json(view.into()))
}

/// Award points for a paid order.
#[utoipa::path(
    post,
    path = "/api/v1/customers/{customerId}/loyalty/earn",
    params(("customerId" = String, Path, description = "Customer identifier")),
    request_body = EarnRequest,
    responses(
        (status = 200, description = "Points awarded", body = EarnResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Order already awarded", body = ErrorSchema)
    ),
    tags = ["loyalty"],
    operation_id = "earnLoyaltyPoints"
)]
#[post("/customers/{customer_id}/loyalty/earn")]
pub async fn earn(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<EarnRequest>,
) -> ApiResult<web::Json<EarnResponse>> {
    let ctx = session.require_tenant()?;
    let EarnRequest {
        order_id,
        order_total,
    } = payload.into_inner();
    let request = EarnPointsRequest {
        customer_id: parse_id(&path, CUSTOMER_ID)?,
        order_id: parse_required_id(order_id, ORDER_ID)?,
        order_total: order_total.into_money("orderTotal")?,
    };
    let outcome = state.loyalty.earn(&ctx, request).await?;
    Ok(web::Json(outcome.into()))
}

/// Spend points for a discount.
#[utoipa::path(
    post,
    path = "/api/v1/customers/{customerId}/loyalty/redeem",
    params(("customerId" = String, Path, description = "Customer identifier")),
    request_body = RedeemRequest,
    responses(
        (status = 200, description = "Discount granted", body = RedeemResponse),
        (status = 400, description = "Invalid request or insufficient points", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["loyalty"],
    operation_id = "redeemLoyaltyPoints"
)]
#[post("/customers/{customer_id}/loyalty/redeem")]
pub async fn redeem(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RedeemRequest>,
) -> ApiResult<web::Json<RedeemResponse>> {
    let ctx = session.require_tenant()?;
    let request = RedeemPointsRequest {
        customer_id: parse_id(&path, CUSTOMER_ID)?,
        points: payload.points,
        currency: parse_currency(&payload.currency)?,
    };
    let outcome = state.loyalty.redeem(&ctx, request).await?;
    Ok(web::Json(outcome.into()))
}

/// Apply a manual correction to a balance.
#[utoipa::path(
    post,
    path = "/api/v1/customers/{customerId}/loyalty/adjust",
    params(("customerId" = String, Path, description = "Customer identifier")),
    request_body = AdjustRequest,
    responses(
        (status = 200, description = "Adjusted account", body = LoyaltyAccountResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["loyalty"],
    operation_id = "adjustLoyaltyPoints"
)]
#[post("/customers/{customer_id}/loyalty/adjust")]
pub async fn adjust(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<AdjustRequest>,
) -> ApiResult<web::Json<LoyaltyAccountResponse>> {
    let ctx = session.require_tenant()?;
    let AdjustRequest { delta, reason } = payload.into_inner();
    let request = AdjustPointsRequest {
        customer_id: parse_id(&path, CUSTOMER_ID)?,
        delta,
        reason,
    };
    let view = state.loyalty.adjust(&ctx, request).await?;
    Ok(web::Json(view.into()))
}

/// Undo the points awarded for a refunded order.
#[utoipa::path(
    post,
    path = "/api/v1/customers/{customerId}/loyalty/reverse",
    params(("customerId" = String, Path, description = "Customer identifier")),
    request_body = ReverseRequest,
    responses(
        (status = 200, description = "Points reversed", body = ReverseResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "No award for the order", body = ErrorSchema),
        (status = 409, description = "Already reversed", body = ErrorSchema)
    ),
    tags = ["loyalty"],
    operation_id = "reverseLoyaltyPoints"
)]
#[post("/customers/{customer_id}/loyalty/reverse")]
pub async fn reverse(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ReverseRequest>,
) -> ApiResult<web::Json<ReverseResponse>> {
    let ctx = session.require_tenant()?;
    let request = ReverseOrderPointsRequest {
        customer_id: parse_id(&path, CUSTOMER_ID)?,
        order_id: parse_required_id(payload.into_inner().order_id, ORDER_ID)?,
    };
    let outcome = state.loyalty.reverse_order(&ctx, request).await?;
    Ok(web::Json(outcome.into()))
}
