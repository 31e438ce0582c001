//! Builders wiring the domain services over their driven adapters.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use storefront::domain::{
    AutomationService, InventoryQueryService, LoyaltyService, ProductSearchService,
    PurchasingService, ReturnsService, ReviewsService, SubscriptionService,
};
use storefront::inbound::http::state::{HttpState, HttpStatePorts};
use storefront::outbound::dispatch::TracingActionDispatcher;
use storefront::outbound::memory::{
    InMemoryAutomationRuleRepository, InMemoryInventoryRepository, InMemoryLoyaltyRepository,
    InMemoryOrderRepository, InMemoryProductCatalogue, InMemoryPurchaseOrderRepository,
    InMemoryReturnRepository, InMemoryReviewRepository, InMemorySubscriptionRepository,
};

use super::config::DomainPolicies;

/// Build the HTTP state over the in-memory store.
///
/// Orders and inventory are shared: returns restock and purchasing receives
/// into the same stock table, and reviews check purchases against the same
/// order book that returns read.
pub(crate) fn build_http_state(policies: &DomainPolicies) -> web::Data<HttpState> {
    build_http_state_with_clock(policies, Arc::new(DefaultClock))
}

fn build_http_state_with_clock(
    policies: &DomainPolicies,
    clock: Arc<dyn Clock>,
) -> web::Data<HttpState> {
    let orders = Arc::new(InMemoryOrderRepository::new());
    let inventory = Arc::new(InMemoryInventoryRepository::new());

    let ports = HttpStatePorts {
        loyalty: Arc::new(LoyaltyService::new(
            Arc::new(InMemoryLoyaltyRepository::new()),
            policies.loyalty.clone(),
            clock.clone(),
        )),
        subscriptions: Arc::new(SubscriptionService::new(
            Arc::new(InMemorySubscriptionRepository::new()),
            policies.subscriptions.clone(),
            clock.clone(),
        )),
        returns: Arc::new(ReturnsService::new(
            orders.clone(),
            Arc::new(InMemoryReturnRepository::new()),
            inventory.clone(),
            policies.returns,
            clock.clone(),
        )),
        inventory: Arc::new(InventoryQueryService::new(inventory.clone())),
        purchasing: Arc::new(PurchasingService::new(
            Arc::new(InMemoryPurchaseOrderRepository::new()),
            inventory,
            clock.clone(),
        )),
        reviews: Arc::new(ReviewsService::new(
            Arc::new(InMemoryReviewRepository::new()),
            orders,
            policies.reviews,
            clock.clone(),
        )),
        automation: Arc::new(AutomationService::new(
            Arc::new(InMemoryAutomationRuleRepository::new()),
            Arc::new(TracingActionDispatcher::new()),
            clock,
        )),
        search: Arc::new(ProductSearchService::new(Arc::new(
            InMemoryProductCatalogue::new(),
        ))),
    };
    web::Data::new(HttpState::new(ports))
}
