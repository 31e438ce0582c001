//! Driving port for automation rules.

use async_trait::async_trait;

use crate::domain::{
    AutomationEvent, AutomationRule, DispatchedAction, Error, RuleDraft, RuleId, TenantContext,
};

/// Automation operations consumed by inbound adapters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationCommand: Send + Sync {
    /// Define a new rule.
    async fn create_rule(
        &self,
        ctx: &TenantContext,
        draft: RuleDraft,
    ) -> Result<AutomationRule, Error>;

    /// Switch a rule on or off.
    async fn set_enabled(
        &self,
        ctx: &TenantContext,
        id: RuleId,
        enabled: bool,
    ) -> Result<AutomationRule, Error>;

    /// Every rule of the tenant in creation order.
    async fn list_rules(&self, ctx: &TenantContext) -> Result<Vec<AutomationRule>, Error>;

    /// Run the tenant's matching rules for an event.
    async fn evaluate(
        &self,
        ctx: &TenantContext,
        event: AutomationEvent,
    ) -> Result<Vec<DispatchedAction>, Error>;
}
