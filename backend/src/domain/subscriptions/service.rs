//! Subscription service implementing [`SubscriptionCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;

use super::{Subscription, SubscriptionDraft, SubscriptionError, SubscriptionPolicy};
use crate::domain::ports::{
    CreateSubscriptionRequest, RenewalOutcome, SubscriptionCommand, SubscriptionRepository,
};
use crate::domain::{Error, Permission, Revisioned, SubscriptionId, TenantContext};

/// Drives subscription transitions against a repository.
#[derive(Clone)]
pub struct SubscriptionService<R> {
    repo: Arc<R>,
    policy: SubscriptionPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> SubscriptionService<R> {
    /// Create a service over `repo`.
    pub fn new(repo: Arc<R>, policy: SubscriptionPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            policy,
            clock,
        }
    }
}

impl<R> SubscriptionService<R>
where
    R: SubscriptionRepository,
{
    async fn load(&self, ctx: &TenantContext, id: SubscriptionId) -> Result<Subscription, Error> {
        self.repo
            .find(ctx.organization_id(), &id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!("subscription {id} not found"))
                    .with_details(json!({ "subscriptionId": id }))
            })
    }

    async fn transition<F>(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
        action: &'static str,
        apply: F,
    ) -> Result<Subscription, Error>
    where
        F: FnOnce(&mut Subscription, DateTime<Utc>) -> Result<(), SubscriptionError> + Send,
    {
        ctx.require(Permission::SubscriptionsManage)?;
        let mut subscription = self.load(ctx, id).await?;
        apply(&mut subscription, self.clock.utc())?;
        let expected = subscription.advance_revision();
        self.repo.save(ctx.organization_id(), &subscription, expected).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            subscription_id = %id,
            action,
            status = subscription.status().as_str(),
            "subscription updated"
        );
        Ok(subscription)
    }
}

#[async_trait]
impl<R> SubscriptionCommand for SubscriptionService<R>
where
    R: SubscriptionRepository,
{
    async fn create(
        &self,
        ctx: &TenantContext,
        request: CreateSubscriptionRequest,
    ) -> Result<Subscription, Error> {
        ctx.require(Permission::SubscriptionsManage)?;
        let mut subscription = Subscription::create(
            SubscriptionId::random(),
            SubscriptionDraft {
                customer_id: request.customer_id,
                plan: request.plan,
                price: request.price,
                interval: request.interval,
                trial_days: request.trial_days,
            },
            self.clock.utc(),
        )?;
        let expected = subscription.advance_revision();
        self.repo.save(ctx.organization_id(), &subscription, expected).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            subscription_id = %subscription.id(),
            customer_id = %subscription.customer_id(),
            status = subscription.status().as_str(),
            "subscription created"
        );
        Ok(subscription)
    }

    async fn get(&self, ctx: &TenantContext, id: SubscriptionId) -> Result<Subscription, Error> {
        ctx.require(Permission::SubscriptionsManage)?;
        self.load(ctx, id).await
    }

    async fn renew(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<RenewalOutcome, Error> {
        let mut charged = None;
        let subscription = self
            .transition(ctx, id, "renew", |subscription, now| {
                charged = subscription.renew(now)?;
                Ok(())
            })
            .await?;
        Ok(RenewalOutcome {
            subscription,
            charged,
        })
    }

    async fn record_payment_failure(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<Subscription, Error> {
        let policy = &self.policy;
        let subscription = self
            .transition(ctx, id, "record_payment_failure", |subscription, now| {
                subscription.record_payment_failure(policy, now)
            })
            .await?;
        tracing::warn!(
            subscription_id = %id,
            attempts = subscription.failed_payment_attempts(),
            status = subscription.status().as_str(),
            "subscription payment failed"
        );
        Ok(subscription)
    }

    async fn pause(&self, ctx: &TenantContext, id: SubscriptionId) -> Result<Subscription, Error> {
        self.transition(ctx, id, "pause", |subscription, now| subscription.pause(now))
            .await
    }

    async fn resume(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
    ) -> Result<Subscription, Error> {
        self.transition(ctx, id, "resume", |subscription, now| subscription.resume(now))
            .await
    }

    async fn cancel(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
        at_period_end: bool,
    ) -> Result<Subscription, Error> {
        self.transition(ctx, id, "cancel", |subscription, now| {
            subscription.cancel(at_period_end, now)
        })
        .await
    }

    async fn upcoming_billing_dates(
        &self,
        ctx: &TenantContext,
        id: SubscriptionId,
        count: usize,
    ) -> Result<Vec<DateTime<Utc>>, Error> {
        ctx.require(Permission::SubscriptionsManage)?;
        let subscription = self.load(ctx, id).await?;
        Ok(subscription.upcoming_billing_dates(count)?)
    }
}
