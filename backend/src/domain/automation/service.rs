//! Automation service implementing [`AutomationCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;

use super::{AutomationEvent, AutomationRule, DispatchedAction, RuleDraft};
use crate::domain::ports::{ActionDispatcher, AutomationCommand, AutomationRuleRepository};
use crate::domain::{Error, Permission, Revisioned, RuleId, TenantContext};

/// Rule management and evaluation.
#[derive(Clone)]
pub struct AutomationService<R, D> {
    rules: Arc<R>,
    dispatcher: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<R, D> AutomationService<R, D> {
    /// Create a service over the rule store and an action dispatcher.
    pub fn new(rules: Arc<R>, dispatcher: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rules,
            dispatcher,
            clock,
        }
    }
}

impl<R, D> AutomationService<R, D>
where
    R: AutomationRuleRepository,
    D: ActionDispatcher,
{
    async fn ordered_rules(&self, ctx: &TenantContext) -> Result<Vec<AutomationRule>, Error> {
        let mut rules = self.rules.list(ctx.organization_id()).await?;
        rules.sort_by_key(AutomationRule::created_at);
        Ok(rules)
    }
}

#[async_trait]
impl<R, D> AutomationCommand for AutomationService<R, D>
where
    R: AutomationRuleRepository,
    D: ActionDispatcher,
{
    async fn create_rule(
        &self,
        ctx: &TenantContext,
        draft: RuleDraft,
    ) -> Result<AutomationRule, Error> {
        ctx.require(Permission::AutomationManage)?;
        let mut rule = AutomationRule::create(RuleId::random(), draft, self.clock.utc())?;
        let expected = rule.advance_revision();
        self.rules.save(ctx.organization_id(), &rule, expected).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            rule_id = %rule.id(),
            trigger = rule.trigger().as_str(),
            actions = rule.actions().len(),
            "automation rule created"
        );
        Ok(rule)
    }

    async fn set_enabled(
        &self,
        ctx: &TenantContext,
        id: RuleId,
        enabled: bool,
    ) -> Result<AutomationRule, Error> {
        ctx.require(Permission::AutomationManage)?;
        let mut rule = self
            .rules
            .find(ctx.organization_id(), &id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("automation rule {id} not found"))
                    .with_details(json!({ "ruleId": id }))
            })?;
        rule.set_enabled(enabled, self.clock.utc());
        let expected = rule.advance_revision();
        self.rules.save(ctx.organization_id(), &rule, expected).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            rule_id = %id,
            enabled,
            "automation rule toggled"
        );
        Ok(rule)
    }

    async fn list_rules(&self, ctx: &TenantContext) -> Result<Vec<AutomationRule>, Error> {
        ctx.require(Permission::AutomationManage)?;
        self.ordered_rules(ctx).await
    }

    async fn evaluate(
        &self,
        ctx: &TenantContext,
        event: AutomationEvent,
    ) -> Result<Vec<DispatchedAction>, Error> {
        ctx.require(Permission::AutomationManage)?;
        let organization_id = ctx.organization_id();
        let mut dispatched = Vec::new();
        for rule in self
            .ordered_rules(ctx)
            .await?
            .iter()
            .filter(|rule| rule.matches(&event))
        {
            for action in rule.dispatches(&event) {
                match self.dispatcher.dispatch(organization_id, &action).await {
                    Ok(()) => dispatched.push(action),
                    Err(error) => tracing::warn!(
                        organization_id = %organization_id,
                        rule_id = %rule.id(),
                        action = action.action.kind(),
                        %error,
                        "automation action dispatch failed"
                    ),
                }
            }
        }
        tracing::info!(
            organization_id = %organization_id,
            trigger = event.trigger.as_str(),
            dispatched = dispatched.len(),
            "automation event evaluated"
        );
        Ok(dispatched)
    }
}
