//! In-memory `OrderRepository`.

use async_trait::async_trait;

use crate::domain::ports::{OrderRepository, OrderRepositoryError};
use crate::domain::{CustomerId, Order, OrderId, OrganizationId, ProductId};

use super::table::TenantTable;

/// Orders held in process memory, partitioned by organization.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: TenantTable<OrderId, Order>,
}

impl InMemoryOrderRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        order_id: &OrderId,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self.orders.get(organization_id, order_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        order: &Order,
        expected_revision: Option<u32>,
    ) -> Result<(), OrderRepositoryError> {
        self.orders
            .save_revision(organization_id, order.id(), order.clone(), expected_revision)
            .await
            .map_err(|stale| OrderRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }

    async fn customer_purchased_product(
        &self,
        organization_id: &OrganizationId,
        customer_id: &CustomerId,
        product_id: &ProductId,
    ) -> Result<bool, OrderRepositoryError> {
        Ok(self
            .orders
            .any(organization_id, |order| {
                order.customer_id() == *customer_id
                    && order.counts_as_purchase()
                    && order
                        .lines()
                        .iter()
                        .any(|line| line.product_id == *product_id)
            })
            .await)
    }
}
