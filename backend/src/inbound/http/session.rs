//! Session helpers to keep HTTP handlers free of framework-specific logic.
//!
//! Sessions are issued by the upstream identity layer. This wrapper only
//! reads the tenant claims it stored (organization, user, role) and turns
//! them into a [`TenantContext`]. Missing or malformed claims are treated as
//! an unauthenticated request.

use std::str::FromStr;

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, OrganizationId, Role, TenantContext, UserId};

pub(crate) const ORGANIZATION_ID_KEY: &str = "organization_id";
pub(crate) const USER_ID_KEY: &str = "user_id";
pub(crate) const ROLE_KEY: &str = "role";

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist tenant claims in the session cookie.
    ///
    /// Used by the identity layer that establishes sessions and by tests.
    pub fn persist_tenant(&self, ctx: &TenantContext) -> Result<(), Error> {
        let insert = |key: &str, value: String| {
            self.0
                .insert(key, value)
                .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
        };
        insert(ORGANIZATION_ID_KEY, ctx.organization_id().to_string())?;
        insert(USER_ID_KEY, ctx.user_id().to_string())?;
        insert(ROLE_KEY, ctx.role().as_str().to_owned())
    }

    fn claim(&self, key: &str) -> Result<Option<String>, Error> {
        self.0
            .get::<String>(key)
            .map_err(|error| Error::internal(format!("failed to read session: {error}")))
    }

    /// Fetch the tenant context from the session, if every claim is valid.
    pub fn tenant(&self) -> Result<Option<TenantContext>, Error> {
        let (Some(organization), Some(user), Some(role)) = (
            self.claim(ORGANIZATION_ID_KEY)?,
            self.claim(USER_ID_KEY)?,
            self.claim(ROLE_KEY)?,
        ) else {
            return Ok(None);
        };

        let parsed = OrganizationId::from_str(&organization)
            .map_err(|err| err.to_string())
            .and_then(|org| {
                UserId::from_str(&user)
                    .map(|user_id| (org, user_id))
                    .map_err(|err| err.to_string())
            })
            .and_then(|(org, user_id)| {
                Role::from_str(&role)
                    .map(|role| TenantContext::new(org, user_id, role))
                    .map_err(|err| err.to_string())
            });

        match parsed {
            Ok(ctx) => Ok(Some(ctx)),
            Err(error) => {
                tracing::warn!(%error, "invalid tenant claims in session cookie");
                Ok(None)
            }
        }
    }

    /// Require an authenticated tenant or return `401 Unauthorized`.
    pub fn require_tenant(&self) -> Result<TenantContext, Error> {
        self.tenant()?
            .ok_or_else(|| Error::unauthorized("login required"))
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

#[cfg(test)]
mod tests {
    use actix_session::Session;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test, web};
    use rstest::rstest;

    use super::*;
    use crate::inbound::http::test_utils::{session_cookie, test_session_middleware};

    const ORG: &str = "6a1d2f0e-4c0b-4f55-9d5e-0f6c1f3f9a01";
    const USER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn session_test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .wrap(test_session_middleware())
            .route(
                "/require",
                web::get().to(|session: SessionContext| async move {
                    let ctx = session.require_tenant()?;
                    Ok::<_, Error>(HttpResponse::Ok().body(format!(
                        "{}/{}/{}",
                        ctx.organization_id(),
                        ctx.user_id(),
                        ctx.role()
                    )))
                }),
            )
            .route(
                "/set-raw",
                web::post().to(
                    |session: Session, claims: web::Json<Vec<(String, String)>>| async move {
                        for (key, value) in claims.into_inner() {
                            session.insert(key, value).expect("set raw claim");
                        }
                        HttpResponse::Ok()
                    },
                ),
            )
    }

    #[actix_web::test]
    async fn round_trips_tenant_claims() {
        let app = test::init_service(session_test_app().route(
            "/set",
            web::get().to(|session: SessionContext| async move {
                let ctx = TenantContext::new(
                    ORG.parse().expect("org id"),
                    USER.parse().expect("user id"),
                    Role::Manager,
                );
                session.persist_tenant(&ctx)?;
                Ok::<_, Error>(HttpResponse::Ok())
            }),
        ))
        .await;

        let set_res =
            test::call_service(&app, test::TestRequest::get().uri("/set").to_request()).await;
        assert_eq!(set_res.status(), StatusCode::OK);
        let cookie = session_cookie(&set_res);

        let get_res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/require")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(get_res.status(), StatusCode::OK);
        let body = test::read_body(get_res).await;
        assert_eq!(body, format!("{ORG}/{USER}/manager"));
    }

    #[actix_web::test]
    async fn missing_claims_are_unauthorised() {
        let app = test::init_service(session_test_app()).await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/require").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[case::bad_org("not-a-uuid", USER, "staff")]
    #[case::bad_user(ORG, "nope", "staff")]
    #[case::bad_role(ORG, USER, "janitor")]
    #[actix_web::test]
    async fn tampered_claims_are_unauthorised(
        #[case] org: &str,
        #[case] user: &str,
        #[case] role: &str,
    ) {
        let app = test::init_service(session_test_app()).await;

        let claims = vec![
            (ORGANIZATION_ID_KEY.to_owned(), org.to_owned()),
            (USER_ID_KEY.to_owned(), user.to_owned()),
            (ROLE_KEY.to_owned(), role.to_owned()),
        ];
        let set_res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/set-raw")
                .set_json(&claims)
                .to_request(),
        )
        .await;
        let cookie = session_cookie(&set_res);

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/require")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
