//! In-memory `AutomationRuleRepository`.

use async_trait::async_trait;

use crate::domain::ports::{AutomationRuleRepository, AutomationRuleRepositoryError};
use crate::domain::{AutomationRule, OrganizationId, RuleId};

use super::table::TenantTable;

/// Automation rules held in process memory, listed in creation order.
#[derive(Debug, Default)]
pub struct InMemoryAutomationRuleRepository {
    rules: TenantTable<RuleId, AutomationRule>,
}

impl InMemoryAutomationRuleRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AutomationRuleRepository for InMemoryAutomationRuleRepository {
    async fn find(
        &self,
        organization_id: &OrganizationId,
        rule_id: &RuleId,
    ) -> Result<Option<AutomationRule>, AutomationRuleRepositoryError> {
        Ok(self.rules.get(organization_id, rule_id).await)
    }

    async fn save(
        &self,
        organization_id: &OrganizationId,
        rule: &AutomationRule,
        expected_revision: Option<u32>,
    ) -> Result<(), AutomationRuleRepositoryError> {
        self.rules
            .save_revision(organization_id, rule.id(), rule.clone(), expected_revision)
            .await
            .map_err(|stale| AutomationRuleRepositoryError::RevisionMismatch {
                expected: stale.expected,
                actual: stale.actual,
            })
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<AutomationRule>, AutomationRuleRepositoryError> {
        Ok(self.rules.list(organization_id).await)
    }
}
