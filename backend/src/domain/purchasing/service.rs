//! Purchasing service implementing [`PurchasingCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;

use super::{LineReceipt, PurchaseOrder, PurchasingError};
use crate::domain::inventory::{StockChange, apply_stock_changes, check_stock_changes};
use crate::domain::ports::{
    CreatePurchaseOrderRequest, InventoryRepository, PurchaseOrderRepository, PurchasingCommand,
};
use crate::domain::{Error, Permission, PurchaseOrderId, Revisioned, TenantContext};

/// Purchase order workflow backed by a repository and the stock ledger.
#[derive(Clone)]
pub struct PurchasingService<P, I> {
    purchase_orders: Arc<P>,
    inventory: Arc<I>,
    clock: Arc<dyn Clock>,
}

impl<P, I> PurchasingService<P, I> {
    /// Create a service over the purchase order and inventory repositories.
    pub fn new(purchase_orders: Arc<P>, inventory: Arc<I>, clock: Arc<dyn Clock>) -> Self {
        Self {
            purchase_orders,
            inventory,
            clock,
        }
    }
}

impl<P, I> PurchasingService<P, I>
where
    P: PurchaseOrderRepository,
    I: InventoryRepository,
{
    async fn load(&self, ctx: &TenantContext, id: PurchaseOrderId) -> Result<PurchaseOrder, Error> {
        self.purchase_orders
            .find(ctx.organization_id(), &id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("purchase order {id} not found"))
                    .with_details(json!({ "purchaseOrderId": id }))
            })
    }

    async fn store(&self, ctx: &TenantContext, order: &mut PurchaseOrder) -> Result<(), Error> {
        let expected = order.advance_revision();
        self.purchase_orders
            .save(ctx.organization_id(), order, expected)
            .await?;
        Ok(())
    }

    async fn transition<F>(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
        apply: F,
    ) -> Result<PurchaseOrder, Error>
    where
        F: FnOnce(&mut PurchaseOrder, DateTime<Utc>) -> Result<(), PurchasingError> + Send,
    {
        ctx.require(Permission::PurchasingManage)?;
        let mut order = self.load(ctx, id).await?;
        apply(&mut order, self.clock.utc())?;
        self.store(ctx, &mut order).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            purchase_order_id = %id,
            status = order.status().as_str(),
            "purchase order updated"
        );
        Ok(order)
    }
}

#[async_trait]
impl<P, I> PurchasingCommand for PurchasingService<P, I>
where
    P: PurchaseOrderRepository,
    I: InventoryRepository,
{
    async fn create(
        &self,
        ctx: &TenantContext,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrder, Error> {
        ctx.require(Permission::PurchasingManage)?;
        let mut order = PurchaseOrder::create(
            PurchaseOrderId::random(),
            &request.supplier,
            request.lines,
            request.expected_at,
            self.clock.utc(),
        )?;
        self.store(ctx, &mut order).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            purchase_order_id = %order.id(),
            supplier = order.supplier(),
            lines = order.lines().len(),
            "purchase order created"
        );
        Ok(order)
    }

    async fn get(&self, ctx: &TenantContext, id: PurchaseOrderId) -> Result<PurchaseOrder, Error> {
        ctx.require(Permission::PurchasingManage)?;
        self.load(ctx, id).await
    }

    async fn submit(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, Error> {
        self.transition(ctx, id, |order, now| order.submit(now))
            .await
    }

    async fn receive(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
        receipts: Vec<LineReceipt>,
    ) -> Result<PurchaseOrder, Error> {
        ctx.require(Permission::PurchasingManage)?;
        let mut order = self.load(ctx, id).await?;
        let delivered = order.receive(&receipts, self.clock.utc())?;
        let changes: Vec<StockChange> = delivered
            .iter()
            .map(|receipt| StockChange::Receive {
                product_id: receipt.product_id,
                quantity: receipt.quantity,
                unit_cost: receipt.unit_cost,
            })
            .collect();
        // Stock is written only once the receipt itself is committed, so a
        // rejected or raced receipt leaves on-hand counts untouched.
        check_stock_changes(self.inventory.as_ref(), ctx.organization_id(), &changes).await?;
        self.store(ctx, &mut order).await?;
        apply_stock_changes(self.inventory.as_ref(), ctx.organization_id(), &changes).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            purchase_order_id = %id,
            lines = delivered.len(),
            status = order.status().as_str(),
            "purchase order received"
        );
        Ok(order)
    }

    async fn cancel(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, Error> {
        self.transition(ctx, id, |order, now| order.cancel(now))
            .await
    }
}
