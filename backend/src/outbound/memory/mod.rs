//! In-memory repositories for every driven persistence port.
//!
//! Rows are partitioned by organization id; a lookup under the wrong
//! organization misses exactly like a lookup for an unknown id. Nothing is
//! durable: state lives for the lifetime of the process.

mod automation;
mod catalogue;
mod inventory;
mod loyalty;
mod orders;
mod purchasing;
mod returns;
mod reviews;
mod subscriptions;
mod table;

pub use automation::InMemoryAutomationRuleRepository;
pub use catalogue::InMemoryProductCatalogue;
pub use inventory::InMemoryInventoryRepository;
pub use loyalty::InMemoryLoyaltyRepository;
pub use orders::InMemoryOrderRepository;
pub use purchasing::InMemoryPurchaseOrderRepository;
pub use returns::InMemoryReturnRepository;
pub use reviews::InMemoryReviewRepository;
pub use subscriptions::InMemorySubscriptionRepository;
