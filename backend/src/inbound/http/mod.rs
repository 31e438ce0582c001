//! HTTP inbound adapter exposing REST endpoints.
//!
//! Handlers translate JSON and path parameters into driving-port requests
//! and map domain errors onto status codes. Every handler under `/api/v1`
//! requires a session established by the host application.

use actix_web::web;

pub mod automation;
pub mod dto;
pub mod error;
pub mod health;
pub mod inventory;
pub mod loyalty;
pub mod purchasing;
pub mod returns;
pub mod reviews;
pub mod schemas;
pub mod search;
pub mod session;
pub mod state;
pub mod subscriptions;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod validation;

pub use error::ApiResult;

/// Register every `/api/v1` handler together with the JSON and query
/// extractor settings they rely on.
///
/// Mount it under the API scope:
///
/// ```
/// use actix_web::{App, web};
/// use storefront::inbound::http::configure_api;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(validation::json_config())
        .app_data(validation::query_config())
        .service(loyalty::get_account)
        .service(loyalty::earn)
        .service(loyalty::redeem)
        .service(loyalty::adjust)
        .service(loyalty::reverse)
        .service(subscriptions::create_subscription)
        .service(subscriptions::get_subscription)
        .service(subscriptions::renew_subscription)
        .service(subscriptions::record_payment_failure)
        .service(subscriptions::pause_subscription)
        .service(subscriptions::resume_subscription)
        .service(subscriptions::cancel_subscription)
        .service(subscriptions::billing_dates)
        .service(returns::open_return)
        .service(returns::get_return)
        .service(returns::list_order_returns)
        .service(returns::approve_return)
        .service(returns::reject_return)
        .service(returns::cancel_return)
        .service(returns::receive_return)
        .service(returns::refund_return)
        // Literal segment first so it is not parsed as a product id.
        .service(inventory::list_low_stock)
        .service(inventory::get_stock)
        .service(purchasing::create_purchase_order)
        .service(purchasing::get_purchase_order)
        .service(purchasing::submit_purchase_order)
        .service(purchasing::receive_purchase_order)
        .service(purchasing::cancel_purchase_order)
        .service(search::search_products)
        .service(reviews::submit_review)
        .service(reviews::moderate_review)
        .service(reviews::list_reviews)
        .service(reviews::review_summary)
        .service(automation::list_rules)
        .service(automation::create_rule)
        .service(automation::set_rule_enabled)
        .service(automation::evaluate_event);
}
