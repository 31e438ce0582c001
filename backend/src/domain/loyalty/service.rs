//! Loyalty service implementing [`LoyaltyCommand`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use super::{EarnOutcome, LoyaltyAccount, LoyaltyPolicy, ReverseOutcome};
use crate::domain::ports::{
    AdjustPointsRequest, EarnPointsRequest, LoyaltyAccountView, LoyaltyCommand, LoyaltyRepository,
    RedeemOutcome, RedeemPointsRequest, ReverseOrderPointsRequest,
};
use crate::domain::{CustomerId, Error, OrganizationId, Permission, Revisioned, TenantContext};

/// Loads accounts, applies the policy, and persists the result.
#[derive(Clone)]
pub struct LoyaltyService<R> {
    repo: Arc<R>,
    policy: LoyaltyPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> LoyaltyService<R> {
    /// Create a service over `repo`.
    pub fn new(repo: Arc<R>, policy: LoyaltyPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            policy,
            clock,
        }
    }
}

impl<R> LoyaltyService<R>
where
    R: LoyaltyRepository,
{
    async fn load(
        &self,
        organization_id: &OrganizationId,
        customer_id: CustomerId,
    ) -> Result<LoyaltyAccount, Error> {
        Ok(self
            .repo
            .find(organization_id, &customer_id)
            .await?
            .unwrap_or_else(|| LoyaltyAccount::new(customer_id)))
    }

    /// Save at the next revision; a concurrent write to the same account
    /// turns this one into a conflict.
    async fn store(
        &self,
        organization_id: &OrganizationId,
        account: &mut LoyaltyAccount,
    ) -> Result<(), Error> {
        let expected = account.advance_revision();
        self.repo.save(organization_id, account, expected).await?;
        Ok(())
    }

    fn view(&self, account: LoyaltyAccount) -> LoyaltyAccountView {
        LoyaltyAccountView {
            next_tier: account.tier().next(),
            points_to_next_tier: account.points_to_next_tier(&self.policy),
            account,
        }
    }
}

#[async_trait]
impl<R> LoyaltyCommand for LoyaltyService<R>
where
    R: LoyaltyRepository,
{
    async fn get_account(
        &self,
        ctx: &TenantContext,
        customer_id: CustomerId,
    ) -> Result<LoyaltyAccountView, Error> {
        ctx.require(Permission::LoyaltyView)?;
        let account = self.load(ctx.organization_id(), customer_id).await?;
        Ok(self.view(account))
    }

    async fn earn(
        &self,
        ctx: &TenantContext,
        request: EarnPointsRequest,
    ) -> Result<EarnOutcome, Error> {
        ctx.require(Permission::LoyaltyManage)?;
        let mut account = self.load(ctx.organization_id(), request.customer_id).await?;
        let outcome = account.earn(
            &self.policy,
            request.order_id,
            request.order_total,
            self.clock.utc(),
        )?;
        self.store(ctx.organization_id(), &mut account).await?;
        tracing::info!(
            organization_id = %ctx.organization_id(),
            customer_id = %request.customer_id,
            order_id = %request.order_id,
            points = outcome.points,
            tier = outcome.tier.as_str(),
            "loyalty points earned"
        );
        if outcome.tier_changed() {
            tracing::info!(
                customer_id = %request.customer_id,
                from = outcome.previous_tier.as_str(),
                to = outcome.tier.as_str(),
                "loyalty tier changed"
            );
        }
        Ok(outcome)
    }

    async fn redeem(
        &self,
        ctx: &TenantContext,
        request: RedeemPointsRequest,
    ) -> Result<RedeemOutcome, Error> {
        ctx.require(Permission::LoyaltyManage)?;
        let mut account = self.load(ctx.organization_id(), request.customer_id).await?;
        let discount = account.redeem(
            &self.policy,
            request.points,
            request.currency,
            self.clock.utc(),
        )?;
        self.store(ctx.organization_id(), &mut account).await?;
        tracing::info!(
            customer_id = %request.customer_id,
            points = request.points,
            discount = %discount,
            "loyalty points redeemed"
        );
        Ok(RedeemOutcome {
            discount,
            balance: account.balance(),
        })
    }

    async fn adjust(
        &self,
        ctx: &TenantContext,
        request: AdjustPointsRequest,
    ) -> Result<LoyaltyAccountView, Error> {
        ctx.require(Permission::LoyaltyManage)?;
        let mut account = self.load(ctx.organization_id(), request.customer_id).await?;
        account.adjust(
            &self.policy,
            request.delta,
            &request.reason,
            self.clock.utc(),
        )?;
        self.store(ctx.organization_id(), &mut account).await?;
        tracing::info!(
            customer_id = %request.customer_id,
            user_id = %ctx.user_id(),
            delta = request.delta,
            "loyalty balance adjusted"
        );
        Ok(self.view(account))
    }

    async fn reverse_order(
        &self,
        ctx: &TenantContext,
        request: ReverseOrderPointsRequest,
    ) -> Result<ReverseOutcome, Error> {
        ctx.require(Permission::LoyaltyManage)?;
        let mut account = self.load(ctx.organization_id(), request.customer_id).await?;
        let outcome = account.reverse_order(&self.policy, request.order_id, self.clock.utc())?;
        self.store(ctx.organization_id(), &mut account).await?;
        tracing::info!(
            customer_id = %request.customer_id,
            order_id = %request.order_id,
            points_removed = outcome.points_removed,
            "loyalty points reversed"
        );
        Ok(outcome)
    }
}
