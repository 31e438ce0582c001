//! Domain primitives, business rules, and ports.
//!
//! Purpose: hold every storefront rule that is independent of transport and
//! storage. Inbound adapters call the driving ports in [`ports`]; services in
//! this module implement them on top of the driven ports. Nothing here knows
//! about Actix, sessions, or HTTP status codes.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure envelope.
//! - TenantContext / Role / Permission: who is calling and what they may do.
//! - Money / CurrencyCode: integer minor-unit amounts.
//! - One module per business area (loyalty, subscriptions, returns,
//!   purchasing, reviews, automation, search, inventory) with its aggregate,
//!   policy, errors, and service.
//! - Revisioned: optimistic revision checks shared by every aggregate.

pub mod error;
pub mod ports;

mod automation;
mod ids;
mod inventory;
mod loyalty;
mod money;
mod orders;
mod purchasing;
mod returns;
mod revision;
mod reviews;
mod search;
mod subscriptions;
mod tenancy;
mod trace_id;

#[cfg(test)]
pub(crate) mod test_support;

pub use self::automation::{
    Action, AutomationError, AutomationEvent, AutomationRule, AutomationService, Condition,
    ConditionOperator, DispatchedAction, RenderedAction, RuleDraft, TriggerKind, lookup,
    render_template, value_text,
};
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::ids::{
    CustomerId, IdParseError, OrderId, OrderLineId, OrganizationId, ProductId, PurchaseOrderId,
    PurchaseOrderLineId, ReturnId, ReviewId, RuleId, SubscriptionId, UserId,
};
pub use self::inventory::{InventoryError, InventoryQueryService, StockLevel};
pub use self::loyalty::{
    EarnOutcome, LedgerEntry, LedgerKind, LoyaltyAccount, LoyaltyError, LoyaltyPolicy,
    LoyaltyPolicyError, LoyaltyService, LoyaltyTier, ReverseOutcome, TierTable,
};
pub use self::money::{BASIS_POINTS_SCALE, CurrencyCode, Money, MoneyError};
pub use self::orders::{Order, OrderDraft, OrderError, OrderLine, OrderStatus};
pub use self::purchasing::{
    LineReceipt, PurchaseOrder, PurchaseOrderAction, PurchaseOrderLine, PurchaseOrderLineDraft,
    PurchaseOrderStatus, PurchasingError, PurchasingService, StockReceipt,
};
pub use self::returns::{
    ItemCondition, ReceivedLine, RefundBreakdown, ReturnAction, ReturnError, ReturnLine,
    ReturnLineRequest, ReturnPolicy, ReturnReason, ReturnRequest, ReturnStatus, ReturnsService,
};
pub use self::revision::Revisioned;
pub use self::reviews::{
    MAX_BODY_CHARS, MAX_TITLE_CHARS, ModerationDecision, Rating, Review, ReviewDraft, ReviewError,
    ReviewPolicy, ReviewStatus, ReviewSummary, ReviewsService,
};
pub use self::search::{
    DESCRIPTION_WORD_SCORE, NAME_PREFIX_SCORE, NAME_WORD_SCORE, ProductSearchService,
    ProductSummary, SKU_MATCH_SCORE, SearchHit, TAG_SCORE, rank, score, tokenize,
};
pub use self::subscriptions::{
    BillingInterval, IntervalUnit, MAX_FORECAST_DATES, Subscription, SubscriptionAction,
    SubscriptionDraft, SubscriptionError, SubscriptionPolicy, SubscriptionService,
    SubscriptionStatus, boundary,
};
pub use self::tenancy::{Permission, Role, TenantContext, UnknownRole};
pub use self::trace_id::TraceId;

/// Convenient result alias for driving port operations.
///
/// # Examples
/// ```
/// use storefront::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<u32> {
///     Err(Error::not_found("nope"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
