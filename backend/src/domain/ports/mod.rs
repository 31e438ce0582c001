//! Domain ports defining the edges of the hexagon.
//!
//! Driven ports (`*Repository`, [`ProductCatalogue`], [`ActionDispatcher`])
//! describe what the domain needs from storage and delivery adapters. Every
//! driven call takes the caller's organization id, so an adapter can never
//! hand one tenant another tenant's data. Driving ports (`*Command`,
//! `*Query`) are what inbound adapters call; they take a
//! [`TenantContext`](crate::domain::TenantContext) and check permissions
//! before doing anything.

mod macros;
pub(crate) use macros::define_port_error;

mod action_dispatcher;
mod automation_command;
mod automation_rule_repository;
mod inventory_query;
mod inventory_repository;
mod loyalty_command;
mod loyalty_repository;
mod order_repository;
mod product_catalogue;
mod product_search_query;
mod purchase_order_repository;
mod purchasing_command;
mod return_repository;
mod returns_command;
mod review_repository;
mod reviews_command;
mod subscription_command;
mod subscription_repository;

#[cfg(test)]
pub use action_dispatcher::MockActionDispatcher;
pub use action_dispatcher::{ActionDispatchError, ActionDispatcher, NoOpActionDispatcher};
pub use automation_command::AutomationCommand;
#[cfg(test)]
pub use automation_command::MockAutomationCommand;
#[cfg(test)]
pub use automation_rule_repository::MockAutomationRuleRepository;
pub use automation_rule_repository::{AutomationRuleRepository, AutomationRuleRepositoryError};
pub use inventory_query::InventoryQuery;
#[cfg(test)]
pub use inventory_query::MockInventoryQuery;
#[cfg(test)]
pub use inventory_repository::MockInventoryRepository;
pub use inventory_repository::{InventoryRepository, InventoryRepositoryError};
#[cfg(test)]
pub use loyalty_command::MockLoyaltyCommand;
pub use loyalty_command::{
    AdjustPointsRequest, EarnPointsRequest, LoyaltyAccountView, LoyaltyCommand, RedeemOutcome,
    RedeemPointsRequest, ReverseOrderPointsRequest,
};
#[cfg(test)]
pub use loyalty_repository::MockLoyaltyRepository;
pub use loyalty_repository::{LoyaltyRepository, LoyaltyRepositoryError};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{OrderRepository, OrderRepositoryError};
#[cfg(test)]
pub use product_catalogue::MockProductCatalogue;
pub use product_catalogue::{ProductCatalogue, ProductCatalogueError};
#[cfg(test)]
pub use product_search_query::MockProductSearchQuery;
pub use product_search_query::{ProductSearchQuery, ProductSearchRequest};
#[cfg(test)]
pub use purchase_order_repository::MockPurchaseOrderRepository;
pub use purchase_order_repository::{PurchaseOrderRepository, PurchaseOrderRepositoryError};
#[cfg(test)]
pub use purchasing_command::MockPurchasingCommand;
pub use purchasing_command::{CreatePurchaseOrderRequest, PurchasingCommand};
#[cfg(test)]
pub use return_repository::MockReturnRepository;
pub use return_repository::{ReturnRepository, ReturnRepositoryError};
#[cfg(test)]
pub use returns_command::MockReturnsCommand;
pub use returns_command::{OpenReturnRequest, ReturnsCommand};
#[cfg(test)]
pub use review_repository::MockReviewRepository;
pub use review_repository::{ReviewRepository, ReviewRepositoryError};
#[cfg(test)]
pub use reviews_command::MockReviewsCommand;
pub use reviews_command::{ReviewsCommand, SubmitReviewRequest};
#[cfg(test)]
pub use subscription_command::MockSubscriptionCommand;
pub use subscription_command::{CreateSubscriptionRequest, RenewalOutcome, SubscriptionCommand};
#[cfg(test)]
pub use subscription_repository::MockSubscriptionRepository;
pub use subscription_repository::{SubscriptionRepository, SubscriptionRepositoryError};
