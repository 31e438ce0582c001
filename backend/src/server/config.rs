//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
use storefront::config::{ConfigError, PolicySettings};
use storefront::domain::{LoyaltyPolicy, ReturnPolicy, ReviewPolicy, SubscriptionPolicy};

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Business rules handed to the domain services at start-up.
#[derive(Debug, Clone, Default)]
pub struct DomainPolicies {
    pub(crate) loyalty: LoyaltyPolicy,
    pub(crate) returns: ReturnPolicy,
    pub(crate) subscriptions: SubscriptionPolicy,
    pub(crate) reviews: ReviewPolicy,
}

impl DomainPolicies {
    /// Resolve every policy from the loaded settings.
    pub fn from_settings(settings: &PolicySettings) -> Result<Self, ConfigError> {
        Ok(Self {
            loyalty: settings.loyalty_policy()?,
            returns: settings.return_policy(),
            subscriptions: settings.subscription_policy(),
            reviews: settings.review_policy(),
        })
    }
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) policies: DomainPolicies,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration with default business rules.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            policies: DomainPolicies::default(),
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Replace the business rules passed to the domain services.
    #[must_use]
    pub fn with_policies(mut self, policies: DomainPolicies) -> Self {
        self.policies = policies;
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
