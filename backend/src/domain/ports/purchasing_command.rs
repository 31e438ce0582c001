//! Driving port for supplier purchase orders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Error, LineReceipt, PurchaseOrder, PurchaseOrderId, PurchaseOrderLineDraft, TenantContext,
};

/// Raise a new purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    /// Supplier the order is placed with.
    pub supplier: String,
    /// Products and quantities ordered.
    pub lines: Vec<PurchaseOrderLineDraft>,
    /// Expected delivery date.
    #[serde(default)]
    pub expected_at: Option<DateTime<Utc>>,
}

/// Purchasing operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchasingCommand: Send + Sync {
    /// Create a draft purchase order.
    async fn create(
        &self,
        ctx: &TenantContext,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrder, Error>;

    /// Read a purchase order.
    async fn get(&self, ctx: &TenantContext, id: PurchaseOrderId)
    -> Result<PurchaseOrder, Error>;

    /// Send a draft to the supplier.
    async fn submit(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, Error>;

    /// Book a delivery into stock.
    async fn receive(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
        receipts: Vec<LineReceipt>,
    ) -> Result<PurchaseOrder, Error>;

    /// Abandon an order that has not started arriving.
    async fn cancel(
        &self,
        ctx: &TenantContext,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, Error>;
}
