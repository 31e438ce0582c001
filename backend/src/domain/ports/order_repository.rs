//! Port for reading orders and recording refunds against them.

use async_trait::async_trait;

use crate::domain::{CustomerId, Order, OrderId, OrganizationId, ProductId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by order repository adapters.
    pub enum OrderRepositoryError for "order repository" with revisions
}

/// Tenant-scoped access to orders.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order owned by the organization.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, OrderRepositoryError>;

    /// Persist an order (after a refund was applied).
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        order: &Order,
        expected_revision: Option<u32>,
    ) -> Result<(), OrderRepositoryError>;

    /// Whether the customer has a received order containing the product.
    async fn customer_purchased_product(
        &self,
        organization_id: &OrganizationId,
        customer_id: &CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, OrderRepositoryError>;
}
