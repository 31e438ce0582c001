//! Driving port for the returns workflow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Error, OrderId, ReceivedLine, ReturnId, ReturnLineRequest, ReturnRequest, TenantContext,
};

/// File a return against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReturnRequest {
    /// Order the goods came from.
    pub order_id: OrderId,
    /// Lines being returned.
    pub lines: Vec<ReturnLineRequest>,
}

/// Returns operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReturnsCommand: Send + Sync {
    /// File a return.
    async fn open(
        &self,
        ctx: &TenantContext,
        request: OpenReturnRequest,
    ) -> Result<ReturnRequest, Error>;

    /// Read a return.
    async fn get(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error>;

    /// Every return filed against an order.
    async fn list_for_order(
        &self,
        ctx: &TenantContext,
        order_id: OrderId,
    ) -> Result<Vec<ReturnRequest>, Error>;

    /// Accept a pending return.
    async fn approve(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error>;

    /// Decline a pending return.
    async fn reject(
        &self,
        ctx: &TenantContext,
        id: ReturnId,
        note: Option<String>,
    ) -> Result<ReturnRequest, Error>;

    /// Withdraw a return before the goods arrive.
    async fn cancel(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error>;

    /// Book in the goods and restock what can be resold.
    async fn receive(
        &self,
        ctx: &TenantContext,
        id: ReturnId,
        lines: Vec<ReceivedLine>,
    ) -> Result<ReturnRequest, Error>;

    /// Refund a received return.
    async fn refund(&self, ctx: &TenantContext, id: ReturnId) -> Result<ReturnRequest, Error>;
}
