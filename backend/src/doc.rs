//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: every `/api/v1` handler plus the health probes
//! - **Schemas**: the error envelope wrappers ([`ErrorSchema`],
//!   [`ErrorCodeSchema`]); request and response bodies are collected from
//!   the paths that reference them
//! - **Security**: Session cookie authentication scheme
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie carrying the organization, user, and role claims.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Storefront commerce API",
        description = "Multi-tenant loyalty, subscriptions, returns, purchasing, reviews, \
                       automation, and catalogue search.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::loyalty::get_account,
        crate::inbound::http::loyalty::earn,
        crate::inbound::http::loyalty::redeem,
        crate::inbound::http::loyalty::adjust,
        crate::inbound::http::loyalty::reverse,
        crate::inbound::http::subscriptions::create_subscription,
        crate::inbound::http::subscriptions::get_subscription,
        crate::inbound::http::subscriptions::renew_subscription,
        crate::inbound::http::subscriptions::record_payment_failure,
        crate::inbound::http::subscriptions::pause_subscription,
        crate::inbound::http::subscriptions::resume_subscription,
        crate::inbound::http::subscriptions::cancel_subscription,
        crate::inbound::http::subscriptions::billing_dates,
        crate::inbound::http::returns::open_return,
        crate::inbound::http::returns::get_return,
        crate::inbound::http::returns::list_order_returns,
        crate::inbound::http::returns::approve_return,
        crate::inbound::http::returns::reject_return,
        crate::inbound::http::returns::cancel_return,
        crate::inbound::http::returns::receive_return,
        crate::inbound::http::returns::refund_return,
        crate::inbound::http::inventory::list_low_stock,
        crate::inbound::http::inventory::get_stock,
        crate::inbound::http::purchasing::create_purchase_order,
        crate::inbound::http::purchasing::get_purchase_order,
        crate::inbound::http::purchasing::submit_purchase_order,
        crate::inbound::http::purchasing::receive_purchase_order,
        crate::inbound::http::purchasing::cancel_purchase_order,
        crate::inbound::http::reviews::submit_review,
        crate::inbound::http::reviews::moderate_review,
        crate::inbound::http::reviews::list_reviews,
        crate::inbound::http::reviews::review_summary,
        crate::inbound::http::automation::list_rules,
        crate::inbound::http::automation::create_rule,
        crate::inbound::http::automation::set_rule_enabled,
        crate::inbound::http::automation::evaluate_event,
        crate::inbound::http::search::search_products,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "loyalty", description = "Points, tiers, and redemptions"),
        (name = "subscriptions", description = "Recurring billing lifecycle"),
        (name = "returns", description = "Return requests, restocking, and refunds"),
        (name = "inventory", description = "Stock levels"),
        (name = "purchasing", description = "Supplier purchase orders"),
        (name = "reviews", description = "Product reviews and moderation"),
        (name = "automation", description = "Event-driven rules"),
        (name = "search", description = "Catalogue keyword search"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::{OpenApi, PartialSchema};
    use utoipa::openapi::schema::Schema;

    use super::*;
    use crate::inbound::http::returns::ReturnLineResponse;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
        assert_object_schema_has_field(error_schema, "traceId");
    }

    #[rstest]
    #[case("/api/v1/customers/{customerId}/loyalty")]
    #[case("/api/v1/subscriptions/{id}/billing-dates")]
    #[case("/api/v1/orders/{orderId}/returns")]
    #[case("/api/v1/inventory/low-stock")]
    #[case("/api/v1/purchase-orders/{id}/receive")]
    #[case("/api/v1/products/{productId}/reviews/summary")]
    #[case("/api/v1/automation/events")]
    #[case("/api/v1/products/search")]
    #[case("/health/ready")]
    fn openapi_registers_path(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    #[case("orderLineId")]
    #[case("productId")]
    #[case("quantity")]
    fn return_line_fields_are_described(#[case] field: &str) {
        let RefOr::T(Schema::Object(line)) = ReturnLineResponse::schema() else {
            panic!("expected Object schema");
        };
        let property = line.properties.get(field).expect("property");
        match property {
            RefOr::T(Schema::Object(obj)) => {
                assert!(obj.description.is_some(), "'{field}' has no description");
            }
            _ => panic!("expected inline schema for '{field}'"),
        }
    }

    #[test]
    fn openapi_declares_session_cookie_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("SessionCookie"));
    }

    #[test]
    fn openapi_collects_referenced_bodies() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.expect("components").schemas;
        for name in ["MoneyBody", "LoyaltyAccountResponse", "SearchPageResponse"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
    }
}
