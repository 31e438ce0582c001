//! Shared harness for storefront integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! this module wires the full HTTP app over the in-memory adapters itself.
//! Orders, stock, and the catalogue have no HTTP surface; tests seed them
//! straight into the adapters the services read from.

use std::sync::{Arc, Mutex, MutexGuard};

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::body::MessageBody;
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::{App, HttpResponse, test, web};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use serde::Deserialize;
use serde_json::Value;

use storefront::Trace;
use storefront::domain::ports::{InventoryRepository, OrderRepository};
use storefront::domain::{
    AutomationService, CustomerId, Error, InventoryQueryService, LoyaltyPolicy, LoyaltyService,
    Money, Order, OrderDraft, OrderId, OrderLine, OrderLineId, OrderStatus, OrganizationId,
    ProductId, ProductSearchService, ProductSummary, PurchasingService, ReturnPolicy,
    ReturnsService, ReviewPolicy, ReviewsService, Revisioned, Role, StockLevel,
    SubscriptionPolicy, SubscriptionService, TenantContext, UserId,
};
use storefront::inbound::http::configure_api;
use storefront::inbound::http::session::SessionContext;
use storefront::inbound::http::state::{HttpState, HttpStatePorts};
use storefront::outbound::dispatch::TracingActionDispatcher;
use storefront::outbound::memory::{
    InMemoryAutomationRuleRepository, InMemoryInventoryRepository, InMemoryLoyaltyRepository,
    InMemoryOrderRepository, InMemoryProductCatalogue, InMemoryPurchaseOrderRepository,
    InMemoryReturnRepository, InMemoryReviewRepository, InMemorySubscriptionRepository,
};

const LOGIN_PATH: &str = "/test-login";

/// Clock the tests move forward by hand.
pub struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().expect("clock mutex poisoned")
    }

    pub fn advance_days(&self, days: i64) {
        *self.lock_clock() += TimeDelta::days(days);
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Noon UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid date")
}

pub fn usd(amount_minor: i64) -> Money {
    Money::parse(amount_minor, "USD").expect("valid money")
}

/// One running storefront with handles on the adapters tests seed.
pub struct Storefront {
    pub clock: Arc<SteppingClock>,
    orders: Arc<InMemoryOrderRepository>,
    inventory: Arc<InMemoryInventoryRepository>,
    catalogue: Arc<InMemoryProductCatalogue>,
    state: web::Data<HttpState>,
}

impl Storefront {
    /// Default business rules with the clock pinned at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_review_policy(now, ReviewPolicy::default())
    }

    pub fn with_review_policy(now: DateTime<Utc>, reviews: ReviewPolicy) -> Self {
        let clock = Arc::new(SteppingClock(Mutex::new(now)));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let orders = Arc::new(InMemoryOrderRepository::new());
        let inventory = Arc::new(InMemoryInventoryRepository::new());
        let catalogue = Arc::new(InMemoryProductCatalogue::new());

        let ports = HttpStatePorts {
            loyalty: Arc::new(LoyaltyService::new(
                Arc::new(InMemoryLoyaltyRepository::new()),
                LoyaltyPolicy::default(),
                shared_clock.clone(),
            )),
            subscriptions: Arc::new(SubscriptionService::new(
                Arc::new(InMemorySubscriptionRepository::new()),
                SubscriptionPolicy::default(),
                shared_clock.clone(),
            )),
            returns: Arc::new(ReturnsService::new(
                orders.clone(),
                Arc::new(InMemoryReturnRepository::new()),
                inventory.clone(),
                ReturnPolicy::default(),
                shared_clock.clone(),
            )),
            inventory: Arc::new(InventoryQueryService::new(inventory.clone())),
            purchasing: Arc::new(PurchasingService::new(
                Arc::new(InMemoryPurchaseOrderRepository::new()),
                inventory.clone(),
                shared_clock.clone(),
            )),
            reviews: Arc::new(ReviewsService::new(
                Arc::new(InMemoryReviewRepository::new()),
                orders.clone(),
                reviews,
                shared_clock.clone(),
            )),
            automation: Arc::new(AutomationService::new(
                Arc::new(InMemoryAutomationRuleRepository::new()),
                Arc::new(TracingActionDispatcher::new()),
                shared_clock,
            )),
            search: Arc::new(ProductSearchService::new(catalogue.clone())),
        };

        Self {
            clock,
            orders,
            inventory,
            catalogue,
            state: web::Data::new(HttpState::new(ports)),
        }
    }

    /// Shared handler state, for building the app with [`storefront_app`].
    pub fn state(&self) -> web::Data<HttpState> {
        self.state.clone()
    }

    /// Store a fulfilled order with one line per `(product, quantity, unit price)`.
    pub async fn seed_fulfilled_order(
        &self,
        organization: OrganizationId,
        customer: CustomerId,
        lines: &[(ProductId, u32, i64)],
        fulfilled_at: DateTime<Utc>,
    ) -> Order {
        let lines: Vec<OrderLine> = lines
            .iter()
            .map(|&(product_id, quantity, unit_price)| OrderLine {
                id: OrderLineId::random(),
                product_id,
                quantity,
                unit_price: usd(unit_price),
            })
            .collect();
        let total = lines.iter().fold(0, |sum, line| {
            sum + line.unit_price.amount_minor() * i64::from(line.quantity)
        });
        let mut order = Order::new(OrderDraft {
            id: OrderId::random(),
            customer_id: customer,
            status: OrderStatus::Fulfilled,
            lines,
            total: usd(total),
            placed_at: fulfilled_at - TimeDelta::days(2),
            fulfilled_at: Some(fulfilled_at),
        })
        .expect("valid order");
        let expected = order.advance_revision();
        self.orders
            .save(&organization, &order, expected)
            .await
            .expect("seed order");
        order
    }

    pub async fn seed_stock(&self, organization: OrganizationId, mut stock: StockLevel) {
        let expected = stock.advance_revision();
        self.inventory
            .save(&organization, &stock, expected)
            .await
            .expect("seed stock");
    }

    pub async fn order(&self, organization: OrganizationId, order_id: OrderId) -> Order {
        self.orders
            .find(&organization, &order_id)
            .await
            .expect("order lookup")
            .expect("order exists")
    }

    pub async fn seed_product(&self, organization: OrganizationId, product: ProductSummary) {
        self.catalogue.upsert(&organization, product).await;
    }
}

/// The API under `/api/v1` plus a login route standing in for the identity
/// layer.
///
/// Takes the state by value so the returned factory borrows nothing and can
/// be handed to `test::init_service`.
pub fn storefront_app(
    state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build();
    App::new()
        .app_data(state)
        .wrap(session)
        .wrap(Trace)
        .route(LOGIN_PATH, web::post().to(login))
        .service(web::scope("/api/v1").configure(configure_api))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    organization_id: OrganizationId,
    role: Role,
}

async fn login(session: SessionContext, body: web::Json<LoginBody>) -> Result<HttpResponse, Error> {
    let LoginBody {
        organization_id,
        role,
    } = body.into_inner();
    session.persist_tenant(&TenantContext::new(organization_id, UserId::random(), role))?;
    Ok(HttpResponse::NoContent().finish())
}

/// Establish a session for `role` in `organization` and return its cookie.
pub async fn login_as<S, B>(app: &S, organization: OrganizationId, role: Role) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri(LOGIN_PATH)
            .set_json(serde_json::json!({
                "organizationId": organization.to_string(),
                "role": role.as_str(),
            }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT, "login failed");
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Send a request with the session cookie and decode the JSON reply.
pub async fn send<S, B>(
    app: &S,
    cookie: &Cookie<'static>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let request = test::TestRequest::default()
        .method(method)
        .uri(uri)
        .cookie(cookie.clone());
    let request = match body {
        Some(json) => request.set_json(json),
        None => request,
    };
    let res = test::call_service(app, request.to_request()).await;
    let status = res.status();
    let bytes = test::read_body(res).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}
