//! Port for automation rule persistence.

use async_trait::async_trait;

use crate::domain::{AutomationRule, OrganizationId, RuleId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by automation rule repository adapters.
    pub enum AutomationRuleRepositoryError for "automation rule repository" with revisions
}

/// Tenant-scoped automation rules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationRuleRepository: Send + Sync {
    /// Find a rule.
    async fn find(
        &self,
        organization_id: &OrganizationId,
        rule_id: &RuleId,
    ) -> Result<Option<AutomationRule>, AutomationRuleRepositoryError>;

    /// Insert or replace a rule.
    ///
    /// `expected_revision` is the revision the stored row must still hold,
    /// `None` when the row must not exist yet. The caller has already
    /// advanced the aggregate to its new revision. A mismatch fails with
    /// `RevisionMismatch` and writes nothing.
    async fn save(
        &self,
        organization_id: &OrganizationId,
        rule: &AutomationRule,
        expected_revision: Option<u32>,
    ) -> Result<(), AutomationRuleRepositoryError>;

    /// Every rule of the organization in creation order.
    async fn list(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AutomationRule>, AutomationRuleRepositoryError>;
}
