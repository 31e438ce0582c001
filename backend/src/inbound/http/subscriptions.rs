//! Subscription lifecycle handlers.
//!
//! ```text
//! POST /api/v1/subscriptions
//! GET  /api/v1/subscriptions/{id}
//! POST /api/v1/subscriptions/{id}/renew
//! POST /api/v1/subscriptions/{id}/payment-failures
//! POST /api/v1/subscriptions/{id}/pause
//! POST /api/v1/subscriptions/{id}/resume
//! POST /api/v1/subscriptions/{id}/cancel
//! GET  /api/v1/subscriptions/{id}/billing-dates?count=3
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{CreateSubscriptionRequest, RenewalOutcome};
use crate::domain::{
    BillingInterval, Error, IntervalUnit, Subscription, SubscriptionId, SubscriptionStatus,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::MoneyBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id, parse_required_id};

const SUBSCRIPTION_ID: FieldName = FieldName::new("subscriptionId");
const CUSTOMER_ID: FieldName = FieldName::new("customerId");
const DEFAULT_FORECAST: usize = 3;

/// Billing cadence on the wire.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntervalBody {
    /// Calendar unit: day, week, month or year.
    #[schema(value_type = String, example = "month")]
    pub unit: IntervalUnit,
    /// Units per period; at least one.
    #[schema(example = 1)]
    pub count: u32,
}

impl From<BillingInterval> for IntervalBody {
    fn from(value: BillingInterval) -> Self {
        Self {
            unit: value.unit(),
            count: value.count(),
        }
    }
}

impl IntervalBody {
    fn into_interval(self) -> Result<BillingInterval, Error> {
        BillingInterval::new(self.unit, self.count).ok_or_else(|| {
            Error::invalid_request("interval count must be at least one").with_details(
                serde_json::json!({ "field": "interval.count", "code": "invalid_interval" }),
            )
        })
    }
}

/// Subscription as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    /// Subscription identifier.
    pub id: String,
    /// Subscriber.
    pub customer_id: String,
    /// Plan name.
    pub plan: String,
    /// Amount charged per cycle.
    pub price: MoneyBody,
    /// Billing cadence.
    pub interval: IntervalBody,
    /// trialing, active, past_due, paused or cancelled.
    #[schema(value_type = String, example = "active")]
    pub status: SubscriptionStatus,
    /// Number of completed paid cycles.
    pub current_cycle: u32,
    /// Start of the current period.
    pub current_period_start: DateTime<Utc>,
    /// End of the current period; the next charge is due then.
    pub current_period_end: DateTime<Utc>,
    /// End of the free trial, if any.
    pub trial_end: Option<DateTime<Utc>>,
    /// Consecutive failed charges.
    pub failed_payment_attempts: u32,
    /// When a failed charge is retried.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// The subscription ends when the current period does.
    pub cancel_at_period_end: bool,
    /// When billing was paused.
    pub paused_at: Option<DateTime<Utc>>,
    /// When the subscription ended.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(value: Subscription) -> Self {
        Self {
            id: value.id().to_string(),
            customer_id: value.customer_id().to_string(),
            plan: value.plan().to_owned(),
            price: value.price().into(),
            interval: value.interval().into(),
            status: value.status(),
            current_cycle: value.current_cycle(),
            current_period_start: value.current_period_start(),
            current_period_end: value.current_period_end(),
            trial_end: value.trial_end(),
            failed_payment_attempts: value.failed_payment_attempts(),
            next_retry_at: value.next_retry_at(),
            cancel_at_period_end: value.cancel_at_period_end(),
            paused_at: value.paused_at(),
            cancelled_at: value.cancelled_at(),
        }
    }
}

/// Request payload for starting a subscription.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionBody {
    /// Subscriber.
    pub customer_id: Option<String>,
    /// Plan name.
    #[schema(example = "Coffee club")]
    pub plan: String,
    /// Amount charged per cycle.
    pub price: MoneyBody,
    /// Billing cadence.
    pub interval: IntervalBody,
    /// Free trial length in days.
    #[serde(default)]
    pub trial_days: u32,
}

/// Result of recording a successful charge.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenewalResponse {
    /// Subscription after the renewal.
    pub subscription: SubscriptionResponse,
    /// Amount charged; absent when a scheduled cancellation took effect.
    pub charged: Option<MoneyBody>,
}

impl From<RenewalOutcome> for RenewalResponse {
    fn from(value: RenewalOutcome) -> Self {
        Self {
            subscription: value.subscription.into(),
            charged: value.charged.map(MoneyBody::from),
        }
    }
}

/// Request payload for cancelling.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelBody {
    /// Keep the subscription running until the current period ends.
    #[serde(default)]
    pub at_period_end: bool,
}

/// Query parameters for the billing forecast.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BillingDatesQuery {
    /// Number of dates to return; defaults to three.
    pub count: Option<usize>,
}

/// Upcoming billing dates.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingDatesResponse {
    pub dates: Vec<DateTime<Utc>>,
}

fn subscription_id(path: &str) -> Result<SubscriptionId, Error> {
    parse_id(path, SUBSCRIPTION_ID)
}

/// Start a subscription.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions",
    request_body = CreateSubscriptionBody,
    responses(
        (status = 201, description = "Subscription created", body = SubscriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "createSubscription"
)]
#[post("/subscriptions")]
pub async fn create_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateSubscriptionBody>,
) -> ApiResult<HttpResponse> {
    let ctx = session.require_tenant()?;
    let CreateSubscriptionBody {
        customer_id,
        plan,
        price,
        interval,
        trial_days,
    } = payload.into_inner();
    let request = CreateSubscriptionRequest {
        customer_id: parse_required_id(customer_id, CUSTOMER_ID)?,
        plan,
        price: price.into_money("price")?,
        interval: interval.into_interval()?,
        trial_days,
    };
    let subscription = state.subscriptions.create(&ctx, request).await?;
    Ok(HttpResponse::Created().json(SubscriptionResponse::from(subscription)))
}

/// Read a subscription.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Subscription", body = SubscriptionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "getSubscription"
)]
#[get("/subscriptions/{id}")]
pub async fn get_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let ctx = session.require_tenant()?;
    let subscription = state.subscriptions.get(&ctx, subscription_id(&path)?).await?;
    Ok(web::Json(subscription.into()))
}

/// Record a successful charge for the due period.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{id}/renew",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Renewed", body = RenewalResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Not due or not renewable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "renewSubscription"
)]
#[post("/subscriptions/{id}/renew")]
pub async fn renew_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<RenewalResponse>> {
    let ctx = session.require_tenant()?;
    let outcome = state.subscriptions.renew(&ctx, subscription_id(&path)?).await?;
    Ok(web::Json(outcome.into()))
}

/// Record a failed charge and schedule a retry.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{id}/payment-failures",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Failure recorded", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Not billable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "recordSubscriptionPaymentFailure"
)]
#[post("/subscriptions/{id}/payment-failures")]
pub async fn record_payment_failure(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let ctx = session.require_tenant()?;
    let subscription = state
        .subscriptions
        .record_payment_failure(&ctx, subscription_id(&path)?)
        .await?;
    Ok(web::Json(subscription.into()))
}

/// Suspend billing.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{id}/pause",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Paused", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Not pausable", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "pauseSubscription"
)]
#[post("/subscriptions/{id}/pause")]
pub async fn pause_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let ctx = session.require_tenant()?;
    let subscription = state.subscriptions.pause(&ctx, subscription_id(&path)?).await?;
    Ok(web::Json(subscription.into()))
}

/// Resume billing after a pause.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{id}/resume",
    params(("id" = String, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Resumed", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Not paused", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "resumeSubscription"
)]
#[post("/subscriptions/{id}/resume")]
pub async fn resume_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let ctx = session.require_tenant()?;
    let subscription = state.subscriptions.resume(&ctx, subscription_id(&path)?).await?;
    Ok(web::Json(subscription.into()))
}

/// Cancel immediately or at the end of the current period.
#[utoipa::path(
    post,
    path = "/api/v1/subscriptions/{id}/cancel",
    params(("id" = String, Path, description = "Subscription identifier")),
    request_body = CancelBody,
    responses(
        (status = 200, description = "Cancelled or scheduled", body = SubscriptionResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Already cancelled", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "cancelSubscription"
)]
#[post("/subscriptions/{id}/cancel")]
pub async fn cancel_subscription(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<CancelBody>,
) -> ApiResult<web::Json<SubscriptionResponse>> {
    let ctx = session.require_tenant()?;
    let subscription = state
        .subscriptions
        .cancel(&ctx, subscription_id(&path)?, payload.at_period_end)
        .await?;
    Ok(web::Json(subscription.into()))
}

/// Forecast the next billing dates.
#[utoipa::path(
    get,
    path = "/api/v1/subscriptions/{id}/billing-dates",
    params(
        ("id" = String, Path, description = "Subscription identifier"),
        BillingDatesQuery
    ),
    responses(
        (status = 200, description = "Billing forecast", body = BillingDatesResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["subscriptions"],
    operation_id = "listSubscriptionBillingDates"
)]
#[get("/subscriptions/{id}/billing-dates")]
pub async fn billing_dates(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<BillingDatesQuery>,
) -> ApiResult<web::Json<BillingDatesResponse>> {
    let ctx = session.require_tenant()?;
    let count = query.count.unwrap_or(DEFAULT_FORECAST);
    let dates = state
        .subscriptions
        .upcoming_billing_dates(&ctx, subscription_id(&path)?, count)
        .await?;
    Ok(web::Json(BillingDatesResponse { dates }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    use super::*;
    use crate::domain::ports::MockSubscriptionCommand;
    use crate::domain::{CustomerId, Money, Role, SubscriptionDraft};
    use crate::inbound::http::state::HttpStatePorts;
    use crate::inbound::http::test_utils::{error_codes, login_cookie, mock_ports, test_app};

    const CUSTOMER: &str = "0b5d7a8e-2f59-4c0e-8d8e-4f7a9e3c1b22";
    const SUBSCRIPTION: &str = "9c0f3a2e-1d4b-4e5f-8a6b-7c8d9e0f1a2b";

    fn subscription(trial_days: u32) -> Subscription {
        let draft = SubscriptionDraft {
            customer_id: CUSTOMER.parse::<CustomerId>().expect("customer"),
            plan: "Coffee club".to_owned(),
            price: Money::parse(1_500, "USD").expect("money"),
            interval: BillingInterval::monthly(),
            trial_days,
        };
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).single().expect("date");
        Subscription::create(SUBSCRIPTION.parse().expect("id"), draft, now).expect("create")
    }

    fn ports_with(subscriptions: MockSubscriptionCommand) -> HttpStatePorts {
        HttpStatePorts {
            subscriptions: Arc::new(subscriptions),
            ..mock_ports()
        }
    }

    #[actix_web::test]
    async fn create_returns_created_subscription() {
        let mut subscriptions = MockSubscriptionCommand::new();
        subscriptions
            .expect_create()
            .withf(|_, request| {
                request.customer_id.to_string() == CUSTOMER
                    && request.interval.unit() == IntervalUnit::Week
                    && request.interval.count() == 2
                    && request.trial_days == 14
            })
            .times(1)
            .returning(|_, _| Ok(subscription(14)));
        let app = actix_test::init_service(test_app(ports_with(subscriptions))).await;
        let cookie = login_cookie(&app, Role::Staff).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/subscriptions")
                .cookie(cookie)
                .set_json(json!({
                    "customerId": CUSTOMER,
                    "plan": "Coffee club",
                    "price": { "amountMinor": 1_500, "currency": "USD" },
                    "interval": { "unit": "week", "count": 2 },
                    "trialDays": 14
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["status"], "trialing");
        assert_eq!(body["interval"]["unit"], "month");
        assert_eq!(body["price"]["amountMinor"], 1_500);
    }

    #[actix_web::test]
    async fn create_rejects_zero_interval() {
        let app = actix_test::init_service(test_app(mock_ports())).await;
        let cookie = login_cookie(&app, Role::Staff).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/subscriptions")
                .cookie(cookie)
                .set_json(json!({
                    "customerId": CUSTOMER,
                    "plan": "Coffee club",
                    "price": { "amountMinor": 1_500, "currency": "USD" },
                    "interval": { "unit": "month", "count": 0 }
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let (_, detail) = error_codes(res).await;
        assert_eq!(detail.as_deref(), Some("invalid_interval"));
    }

    #[actix_web::test]
    async fn renew_reports_charged_amount() {
        let mut subscriptions = MockSubscriptionCommand::new();
        subscriptions.expect_renew().times(1).returning(|_, _| {
            Ok(RenewalOutcome {
                subscription: subscription(0),
                charged: Some(Money::parse(1_500, "USD").expect("money")),
            })
        });
        let app = actix_test::init_service(test_app(ports_with(subscriptions))).await;
        let cookie = login_cookie(&app, Role::Staff).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/subscriptions/{SUBSCRIPTION}/renew"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["charged"]["amountMinor"], 1_500);
        assert_eq!(body["subscription"]["status"], "active");
    }

    #[actix_web::test]
    async fn cancel_forwards_period_end_flag() {
        let mut subscriptions = MockSubscriptionCommand::new();
        subscriptions
            .expect_cancel()
            .withf(|_, id, at_period_end| id.to_string() == SUBSCRIPTION && *at_period_end)
            .times(1)
            .returning(|_, _, _| Ok(subscription(0)));
        let app = actix_test::init_service(test_app(ports_with(subscriptions))).await;
        let cookie = login_cookie(&app, Role::Staff).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/subscriptions/{SUBSCRIPTION}/cancel"))
                .cookie(cookie)
                .set_json(json!({ "atPeriodEnd": true }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn billing_dates_defaults_to_three() {
        let mut subscriptions = MockSubscriptionCommand::new();
        subscriptions
            .expect_upcoming_billing_dates()
            .withf(|_, _, count| *count == DEFAULT_FORECAST)
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).single().expect("date"),
                ])
            });
        let app = actix_test::init_service(test_app(ports_with(subscriptions))).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/subscriptions/{SUBSCRIPTION}/billing-dates"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["dates"], json!(["2024-02-29T09:00:00Z"]));
    }

    #[actix_web::test]
    async fn billing_dates_rejects_non_numeric_count() {
        let app = actix_test::init_service(test_app(mock_ports())).await;
        let cookie = login_cookie(&app, Role::Viewer).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!(
                    "/api/v1/subscriptions/{SUBSCRIPTION}/billing-dates?count=lots"
                ))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let (code, detail) = error_codes(res).await;
        assert_eq!(code, "invalid_request");
        assert_eq!(detail.as_deref(), Some("invalid_query"));
    }
}
