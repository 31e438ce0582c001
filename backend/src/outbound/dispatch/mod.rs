//! Action dispatcher that records automation side effects in the log.
//!
//! Delivery integrations (email, messaging, webhooks) live outside this
//! service. This adapter emits one structured `tracing` event per action so
//! a downstream collector can pick them up.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{ActionDispatchError, ActionDispatcher};
use crate::domain::{DispatchedAction, OrganizationId, RenderedAction};

/// Tracing target used for dispatched automation actions.
pub const DISPATCH_TARGET: &str = "storefront::automation::dispatch";

/// Emits each dispatched action as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActionDispatcher;

impl TracingActionDispatcher {
    /// Create a dispatcher.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionDispatcher for TracingActionDispatcher {
    async fn dispatch(
        &self,
        organization_id: &OrganizationId,
        action: &DispatchedAction,
    ) -> Result<(), ActionDispatchError> {
        let detail = serde_json::to_string(&action.action)
            .map_err(|err| ActionDispatchError::query(format!("encode action: {err}")))?;
        info!(
            target: DISPATCH_TARGET,
            organization_id = %organization_id,
            rule_id = %action.rule_id,
            rule_name = %action.rule_name,
            trigger = action.trigger.as_str(),
            action = action.action.kind(),
            recipient = recipient(&action.action),
            detail = %detail,
            "automation action dispatched"
        );
        Ok(())
    }
}

fn recipient(action: &RenderedAction) -> Option<&str> {
    match action {
        RenderedAction::SendEmail { recipient, .. } => Some(recipient.as_str()),
        RenderedAction::Webhook { url, .. } => Some(url.as_str()),
        RenderedAction::TagCustomer { .. } | RenderedAction::CreateTask { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::{RuleId, TriggerKind};

    fn dispatched(action: RenderedAction) -> DispatchedAction {
        DispatchedAction {
            rule_id: RuleId::random(),
            rule_name: "welcome".to_owned(),
            trigger: TriggerKind::OrderCreated,
            action,
        }
    }

    #[rstest]
    #[case::email(
        RenderedAction::SendEmail {
            template: "welcome".to_owned(),
            recipient: "ada@example.test".to_owned(),
        },
        Some("ada@example.test")
    )]
    #[case::webhook(
        RenderedAction::Webhook {
            url: "https://hooks.example.test/orders".to_owned(),
            payload: json!({ "orderId": "o-1" }),
        },
        Some("https://hooks.example.test/orders")
    )]
    #[case::task(RenderedAction::CreateTask { title: "call back".to_owned() }, None)]
    fn recipient_names_the_destination(
        #[case] action: RenderedAction,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(recipient(&action), expected);
    }

    #[tokio::test]
    async fn dispatch_always_succeeds() {
        let action = dispatched(RenderedAction::TagCustomer {
            tag: "vip".to_owned(),
        });
        TracingActionDispatcher::new()
            .dispatch(&OrganizationId::random(), &action)
            .await
            .expect("dispatched");
    }
}
