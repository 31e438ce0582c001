//! Returns service implementing [`ReturnsCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;

use super::{ReceivedLine, ReturnError, ReturnPolicy, ReturnRequest};
use crate::domain::inventory::{StockChange, apply_stock_changes, check_stock_changes};
use crate::domain::ports::{
    InventoryRepository, OpenReturnRequest, OrderRepository, OrderRepositoryError, ReturnRepository,
    ReturnsCommand,
};
use crate::domain::{Error, Money, Order, OrderId, Permission, ReturnId, Revisioned, TenantContext};

/// Attempts before a contended order write gives up.
const ORDER_WRITE_ATTEMPTS: u32 = 3;

/// Coordinates orders, returns, and inventory for the returns workflow.
#[derive(Clone)]
pub struct ReturnsService<O, R, I> {
    orders: Arc<O>,
    returns: Arc<R>,
    inventory: Arc<I>,
    policy: ReturnPolicy,
    clock: Arc<dyn Clock>,
}

impl<O, R, I> ReturnsService<O, R, I> {
    /// Create a service over the three repositories.
    pub fn new(
        orders: Arc<O>,
        returns: Arc<R>,
        inventory: Arc<I>,
        policy: ReturnPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            returns,
            inventory,
            policy,
            clock,
        }
    }
}

impl<O, R, I> ReturnsService<O, R, I>
where
    O: OrderRepository,
    R: ReturnRepository,
    I: InventoryRepository,
{
    async fn load_order(&self, ctx: &TenantContext, order_id: OrderId) -> Result<Order, Error> {
        self.orders
            .find(ctx.organization_id(), &order_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("order {order_id} not found"))
                    .with_details(json!({ "orderId": order_id }))
            })
    }

    async fn load(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error> {
        self.returns
            .find(ctx.organization_id(), &id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("return {id} not found"))
                    .with_details(json!({ "returnId": id }))
            })
    }

    async fn store(&self, ctx: &TenantContext, request: &mut ReturnRequest) -> Result<(), Error> {
        let expected = request.advance_revision();
        self.returns
            .save(ctx.organization_id(), request, expected)
            .await?;
        Ok(())
    }

    /// Save a refunded order. When another refund got there first the order
    /// is reloaded and `amount` applied again, so neither refund is lost.
    async fn record_refund(
        &self,
        ctx: &TenantContext,
        mut order: Order,
        amount: Money,
    ) -> Result<Order, Error> {
        let mut attempt = 1;
        loop {
            let expected = order.advance_revision();
            match self
                .orders
                .save(ctx.organization_id(), &order, expected)
                .await
            {
                Ok(()) => return Ok(order),
                Err(OrderRepositoryError::RevisionMismatch { .. })
                    if attempt < ORDER_WRITE_ATTEMPTS =>
                {
                    tracing::debug!(
                        order_id = %order.id(),
                        attempt,
                        "order write raced; reloading"
                    );
                    attempt += 1;
                    order = self.load_order(ctx, order.id()).await?;
                    order.apply_refund(amount).map_err(ReturnError::from)?;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn transition<F>(
        &self,
        ctx: &TenantContext,
        id: ReturnId,
        apply: F,
    ) -> Result<ReturnRequest, Error>
    where
        F: FnOnce(&mut ReturnRequest, DateTime<Utc>) -> Result<(), ReturnError> + Send,
    {
        ctx.require(Permission::ReturnsManage)?;
        let mut request = self.load(ctx, id).await?;
        apply(&mut request, self.clock.utc())?;
        self.store(ctx, &mut request).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            return_id = %id,
            status = request.status().as_str(),
            "return updated"
        );
        Ok(request)
    }
}

#[async_trait]
impl<O, R, I> ReturnsCommand for ReturnsService<O, R, I>
where
    O: OrderRepository,
    R: ReturnRepository,
    I: InventoryRepository,
{
    async fn open(
        &self,
        ctx: &TenantContext,
        request: OpenReturnRequest,
    ) -> Result<ReturnRequest, Error> {
        ctx.require(Permission::ReturnsManage)?;
        let order = self.load_order(ctx, request.order_id).await?;
        let existing = self
            .returns
            .list_for_order(ctx.organization_id(), &request.order_id)
            .await?;
        let mut opened = ReturnRequest::open(
            ReturnId::random(),
            &order,
            &existing,
            request.lines,
            &self.policy,
            self.clock.utc(),
        )?;
        self.store(ctx, &mut opened).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            return_id = %opened.id(),
            order_id = %opened.order_id(),
            lines = opened.lines().len(),
            "return requested"
        );
        Ok(opened)
    }

    async fn get(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error> {
        ctx.require(Permission::ReturnsManage)?;
        self.load(ctx, id).await
    }

    async fn list_for_order(
        &self,
        ctx: &TenantContext,
        order_id: OrderId,
    ) -> Result<Vec<ReturnRequest>, Error> {
        ctx.require(Permission::ReturnsManage)?;
        self.load_order(ctx, order_id).await?;
        let mut requests = self
            .returns
            .list_for_order(ctx.organization_id(), &order_id)
            .await?;
        requests.sort_by_key(ReturnRequest::requested_at);
        Ok(requests)
    }

    async fn approve(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error> {
        self.transition(ctx, id, |request, now| request.approve(now))
            .await
    }

    async fn reject(
        &self,
        ctx: &TenantContext,
        id: ReturnId,
        note: Option<String>,
    ) -> Result<ReturnRequest, Error> {
        self.transition(ctx, id, move |request, now| request.reject(note, now))
            .await
    }

    async fn cancel(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error> {
        self.transition(ctx, id, |request, now| request.cancel(now))
            .await
    }

    async fn receive(
        &self,
        ctx: &TenantContext,
        id: ReturnId,
        lines: Vec<ReceivedLine>,
    ) -> Result<ReturnRequest, Error> {
        ctx.require(Permission::ReturnsManage)?;
        let mut request = self.load(ctx, id).await?;
        let changes: Vec<StockChange> = request
            .receive(&lines, self.clock.utc())?
            .into_iter()
            .map(|(product_id, quantity)| StockChange::Restock {
                product_id,
                quantity,
            })
            .collect();
        // Goods go back on the shelf only after the return is committed as
        // received, so a rejected or repeated receipt restocks nothing.
        check_stock_changes(self.inventory.as_ref(), ctx.organization_id(), &changes).await?;
        self.store(ctx, &mut request).await?;
        apply_stock_changes(self.inventory.as_ref(), ctx.organization_id(), &changes).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            return_id = %id,
            "return received"
        );
        Ok(request)
    }

    async fn refund(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error> {
        ctx.require(Permission::ReturnsManage)?;
        let mut request = self.load(ctx, id).await?;
        let mut order = self.load_order(ctx, request.order_id()).await?;
        let breakdown = request.refund(&mut order, &self.policy, self.clock.utc())?;
        // Committing the return first means a second refund of the same
        // return fails here, before the order is charged twice.
        self.store(ctx, &mut request).await?;
        let order = self.record_refund(ctx, order, breakdown.total).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            return_id = %id,
            order_id = %order.id(),
            subtotal = %breakdown.subtotal,
            restocking_fee = %breakdown.restocking_fee,
            total = %breakdown.total,
            order_status = order.status().as_str(),
            "return refunded"
        );
        Ok(request)
    }
}
