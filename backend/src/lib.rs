//! Multi-tenant commerce backend: loyalty, subscriptions, returns,
//! purchasing, reviews, automation, and catalogue search behind an Actix
//! HTTP adapter.
//!
//! Layout follows ports and adapters: [`domain`] holds the rules and the
//! port traits, [`inbound`] and [`outbound`] hold the adapters, and
//! [`config`] loads runtime settings.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
