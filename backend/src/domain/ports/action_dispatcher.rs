//! Port handing rendered automation actions to delivery adapters.

use async_trait::async_trait;

use crate::domain::{DispatchedAction, OrganizationId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by action dispatch adapters.
    pub enum ActionDispatchError for "action dispatcher"
}

/// Delivery channel for automation actions (email, tagging, tasks, webhooks).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    /// Deliver one rendered action.
    async fn dispatch(
        &self,
        organization_id: &OrganizationId,
        action: &DispatchedAction,
    ) -> Result<(), ActionDispatchError>;
}

/// Dispatcher that accepts and drops every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpActionDispatcher;

#[async_trait]
impl ActionDispatcher for NoOpActionDispatcher {
    async fn dispatch(
        &self,
        _organization_id: &OrganizationId,
        _action: &DispatchedAction,
    ) -> Result<(), ActionDispatchError> {
        Ok(())
    }
}
