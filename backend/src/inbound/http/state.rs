//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on driving ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    AutomationCommand, InventoryQuery, LoyaltyCommand, ProductSearchQuery, PurchasingCommand,
    ReturnsCommand, ReviewsCommand, SubscriptionCommand,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub loyalty: Arc<dyn LoyaltyCommand>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
    pub returns: Arc<dyn ReturnsCommand>,
    pub inventory: Arc<dyn InventoryQuery>,
    pub purchasing: Arc<dyn PurchasingCommand>,
    pub reviews: Arc<dyn ReviewsCommand>,
    pub automation: Arc<dyn AutomationCommand>,
    pub search: Arc<dyn ProductSearchQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub loyalty: Arc<dyn LoyaltyCommand>,
    pub subscriptions: Arc<dyn SubscriptionCommand>,
    pub returns: Arc<dyn ReturnsCommand>,
    pub inventory: Arc<dyn InventoryQuery>,
    pub purchasing: Arc<dyn PurchasingCommand>,
    pub reviews: Arc<dyn ReviewsCommand>,
    pub automation: Arc<dyn AutomationCommand>,
    pub search: Arc<dyn ProductSearchQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::{Clock, DefaultClock};
    /// use storefront::domain::{
    ///     AutomationService, InventoryQueryService, LoyaltyPolicy, LoyaltyService,
    ///     ProductSearchService, PurchasingService, ReturnPolicy, ReturnsService, ReviewPolicy,
    ///     ReviewsService, SubscriptionPolicy, SubscriptionService,
    /// };
    /// use storefront::inbound::http::state::{HttpState, HttpStatePorts};
    /// use storefront::outbound::dispatch::TracingActionDispatcher;
    /// use storefront::outbound::memory::{
    ///     InMemoryAutomationRuleRepository, InMemoryInventoryRepository,
    ///     InMemoryLoyaltyRepository, InMemoryOrderRepository, InMemoryProductCatalogue,
    ///     InMemoryPurchaseOrderRepository, InMemoryReturnRepository, InMemoryReviewRepository,
    ///     InMemorySubscriptionRepository,
    /// };
    ///
    /// let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    /// let orders = Arc::new(InMemoryOrderRepository::new());
    /// let inventory = Arc::new(InMemoryInventoryRepository::new());
    /// let ports = HttpStatePorts {
    ///     loyalty: Arc::new(LoyaltyService::new(
    ///         Arc::new(InMemoryLoyaltyRepository::new()),
    ///         LoyaltyPolicy::default(),
    ///         clock.clone(),
    ///     )),
    ///     subscriptions: Arc::new(SubscriptionService::new(
    ///         Arc::new(InMemorySubscriptionRepository::new()),
    ///         SubscriptionPolicy::default(),
    ///         clock.clone(),
    ///     )),
    ///     returns: Arc::new(ReturnsService::new(
    ///         orders.clone(),
    ///         Arc::new(InMemoryReturnRepository::new()),
    ///         inventory.clone(),
    ///         ReturnPolicy::default(),
    ///         clock.clone(),
    ///     )),
    ///     inventory: Arc::new(InventoryQueryService::new(inventory.clone())),
    ///     purchasing: Arc::new(PurchasingService::new(
    ///         Arc::new(InMemoryPurchaseOrderRepository::new()),
    ///         inventory,
    ///         clock.clone(),
    ///     )),
    ///     reviews: Arc::new(ReviewsService::new(
    ///         Arc::new(InMemoryReviewRepository::new()),
    ///         orders,
    ///         ReviewPolicy::default(),
    ///         clock.clone(),
    ///     )),
    ///     automation: Arc::new(AutomationService::new(
    ///         Arc::new(InMemoryAutomationRuleRepository::new()),
    ///         Arc::new(TracingActionDispatcher::new()),
    ///         clock,
    ///     )),
    ///     search: Arc::new(ProductSearchService::new(Arc::new(
    ///         InMemoryProductCatalogue::new(),
    ///     ))),
    /// };
    /// let state = HttpState::new(ports);
    /// let _search = state.search.clone();
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            loyalty,
            subscriptions,
            returns,
            inventory,
            purchasing,
            reviews,
            automation,
            search,
        } = ports;
        Self {
            loyalty,
            subscriptions,
            returns,
            inventory,
            purchasing,
            reviews,
            automation,
            search,
        }
    }
}
