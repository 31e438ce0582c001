//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_http::Request;
use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};
use serde_json::Value;

use crate::domain::ports::{
    MockAutomationCommand, MockInventoryQuery, MockLoyaltyCommand, MockProductSearchQuery,
    MockPurchasingCommand, MockReturnsCommand, MockReviewsCommand, MockSubscriptionCommand,
};
use crate::domain::{Error, OrganizationId, Role, TenantContext, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::configure_api;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

pub(crate) const TEST_ORGANIZATION: &str = "6a1d2f0e-4c0b-4f55-9d5e-0f6c1f3f9a01";
pub(crate) const TEST_USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
const LOGIN_PATH: &str = "/test-login";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Tenant context with fixed identifiers so mocks can match on them.
pub(crate) fn test_tenant(role: Role) -> TenantContext {
    let organization: OrganizationId = TEST_ORGANIZATION.parse().expect("fixture org id");
    let user: UserId = TEST_USER.parse().expect("fixture user id");
    TenantContext::new(organization, user, role)
}

async fn test_login(session: SessionContext, role: web::Path<String>) -> Result<HttpResponse, Error> {
    let role: Role = role.parse().map_err(|_| Error::invalid_request("bad role"))?;
    session.persist_tenant(&test_tenant(role))?;
    Ok(HttpResponse::NoContent().finish())
}

/// Route establishing a session for the role in the last path segment.
pub(crate) fn login_route(cfg: &mut web::ServiceConfig) {
    cfg.route(&format!("{LOGIN_PATH}/{{role}}"), web::post().to(test_login));
}

/// Extract the session cookie set by a response.
pub(crate) fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Log in through [`login_route`] and return the session cookie.
pub(crate) async fn login_cookie<S, B>(app: &S, role: Role) -> Cookie<'static>
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri(&format!("{LOGIN_PATH}/{}", role.as_str()))
            .to_request(),
    )
    .await;
    session_cookie(&res)
}

/// Ports backed by mocks with no expectations; any call fails the test.
pub(crate) fn mock_ports() -> HttpStatePorts {
    HttpStatePorts {
        loyalty: Arc::new(MockLoyaltyCommand::new()),
        subscriptions: Arc::new(MockSubscriptionCommand::new()),
        returns: Arc::new(MockReturnsCommand::new()),
        inventory: Arc::new(MockInventoryQuery::new()),
        purchasing: Arc::new(MockPurchasingCommand::new()),
        reviews: Arc::new(MockReviewsCommand::new()),
        automation: Arc::new(MockAutomationCommand::new()),
        search: Arc::new(MockProductSearchQuery::new()),
    }
}

/// Application exposing the API over `ports` with a test login route.
pub(crate) fn test_app(
    ports: HttpStatePorts,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HttpState::new(ports)))
        .wrap(test_session_middleware())
        .configure(login_route)
        .service(web::scope("/api/v1").configure(configure_api))
}

/// Read a JSON error envelope and return `(code, details.code)`.
pub(crate) async fn error_codes<B>(res: ServiceResponse<B>) -> (String, Option<String>)
where
    B: MessageBody,
{
    let body: Value = test::read_body_json(res).await;
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let detail = body
        .get("details")
        .and_then(|details| details.get("code"))
        .and_then(Value::as_str)
        .map(str::to_owned);
    (code, detail)
}
