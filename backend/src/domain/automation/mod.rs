//! Event-driven automation rules.
//!
//! A rule names a trigger, a list of conditions over the event payload, and
//! the actions to run when every condition holds. Actions are rendered
//! against the payload and handed to the action dispatcher port.

mod conditions;
mod service;

pub use conditions::{Condition, ConditionOperator, lookup, render_template, value_text};
pub use service::AutomationService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use super::{Error, Revisioned, RuleId};

/// Business event that can fire rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// An order was placed.
    OrderCreated,
    /// An order was paid.
    OrderPaid,
    /// An order was fulfilled.
    OrderFulfilled,
    /// A customer asked to return goods.
    ReturnRequested,
    /// A product fell to its reorder point.
    LowStock,
    /// A loyalty account changed tier.
    CustomerTierChanged,
    /// A subscription payment failed.
    SubscriptionPastDue,
    /// A product review was submitted.
    ReviewSubmitted,
}

impl TriggerKind {
    /// Stable lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrderCreated => "order_created",
            Self::OrderPaid => "order_paid",
            Self::OrderFulfilled => "order_fulfilled",
            Self::ReturnRequested => "return_requested",
            Self::LowStock => "low_stock",
            Self::CustomerTierChanged => "customer_tier_changed",
            Self::SubscriptionPastDue => "subscription_past_due",
            Self::ReviewSubmitted => "review_submitted",
        }
    }
}

/// Configured step of a rule. Text fields may hold `{{path}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    /// Email someone named by a payload field.
    SendEmail {
        /// Template name.
        template: String,
        /// Dotted path of the recipient address in the payload.
        recipient_field: String,
    },
    /// Add a tag to the customer.
    TagCustomer {
        /// Tag text.
        tag: String,
    },
    /// Open a task for staff.
    CreateTask {
        /// Task title.
        title: String,
    },
    /// POST the event to an external endpoint.
    Webhook {
        /// Absolute http or https URL.
        url: String,
    },
}

impl Action {
    /// Stable lowercase name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SendEmail { .. } => "send_email",
            Self::TagCustomer { .. } => "tag_customer",
            Self::CreateTask { .. } => "create_task",
            Self::Webhook { .. } => "webhook",
        }
    }

    fn validate(&self, index: usize) -> Result<(), AutomationError> {
        let blank = |field: &'static str| AutomationError::EmptyActionField { index, field };
        match self {
            Self::SendEmail {
                template,
                recipient_field,
            } => {
                if template.trim().is_empty() {
                    return Err(blank("template"));
                }
                if recipient_field.trim().is_empty() {
                    return Err(blank("recipientField"));
                }
            }
            Self::TagCustomer { tag } => {
                if tag.trim().is_empty() {
                    return Err(blank("tag"));
                }
            }
            Self::CreateTask { title } => {
                if title.trim().is_empty() {
                    return Err(blank("title"));
                }
            }
            Self::Webhook { url } => {
                let valid = Url::parse(url)
                    .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"));
                if !valid {
                    return Err(AutomationError::InvalidWebhookUrl(url.clone()));
                }
            }
        }
        Ok(())
    }

    /// Resolve placeholders against an event payload.
    pub fn render(&self, payload: &Value) -> RenderedAction {
        match self {
            Self::SendEmail {
                template,
                recipient_field,
            } => RenderedAction::SendEmail {
                template: render_template(template, payload),
                recipient: value_text(lookup(payload, recipient_field.trim())),
            },
            Self::TagCustomer { tag } => RenderedAction::TagCustomer {
                tag: render_template(tag, payload),
            },
            Self::CreateTask { title } => RenderedAction::CreateTask {
                title: render_template(title, payload),
            },
            Self::Webhook { url } => RenderedAction::Webhook {
                url: url.clone(),
                payload: payload.clone(),
            },
        }
    }
}

/// Action with every placeholder resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RenderedAction {
    /// Email to send.
    SendEmail {
        /// Template name.
        template: String,
        /// Recipient address; empty when the payload had none.
        recipient: String,
    },
    /// Tag to apply.
    TagCustomer {
        /// Tag text.
        tag: String,
    },
    /// Task to open.
    CreateTask {
        /// Task title.
        title: String,
    },
    /// Webhook call to make.
    Webhook {
        /// Target URL.
        url: String,
        /// Event payload to send.
        payload: Value,
    },
}

impl RenderedAction {
    /// Stable lowercase name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SendEmail { .. } => "send_email",
            Self::TagCustomer { .. } => "tag_customer",
            Self::CreateTask { .. } => "create_task",
            Self::Webhook { .. } => "webhook",
        }
    }
}

/// Rendered action together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedAction {
    /// Rule that fired.
    pub rule_id: RuleId,
    /// Name of that rule.
    pub rule_name: String,
    /// Event that fired it.
    pub trigger: TriggerKind,
    /// What to do.
    pub action: RenderedAction,
}

/// Event offered to the rules of a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationEvent {
    /// Kind of event.
    pub trigger: TriggerKind,
    /// Event data that conditions and placeholders read.
    #[serde(default)]
    pub payload: Value,
}

/// Validation failures for rule definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    /// Rule name is blank.
    #[error("rule name must not be empty")]
    EmptyName,
    /// A rule needs something to do.
    #[error("a rule must contain at least one action")]
    NoActions,
    /// A condition has no field path.
    #[error("condition {0} must name a field")]
    EmptyConditionField(usize),
    /// An action is missing required text.
    #[error("action {index} must set {field}")]
    EmptyActionField {
        /// Position of the action.
        index: usize,
        /// Missing field.
        field: &'static str,
    },
    /// Webhook target is not an absolute http(s) URL.
    #[error("webhook url {0:?} must be an absolute http or https URL")]
    InvalidWebhookUrl(String),
}

impl From<AutomationError> for Error {
    fn from(error: AutomationError) -> Self {
        let message = error.to_string();
        let details = match &error {
            AutomationError::EmptyName => json!({ "field": "name" }),
            AutomationError::NoActions => json!({ "field": "actions" }),
            AutomationError::EmptyConditionField(index) => {
                json!({ "field": format!("conditions[{index}].field") })
            }
            AutomationError::EmptyActionField { index, field } => {
                json!({ "field": format!("actions[{index}].{field}") })
            }
            AutomationError::InvalidWebhookUrl(_) => {
                json!({ "field": "actions", "code": "invalid_url" })
            }
        };
        Self::invalid_request(message).with_details(details)
    }
}

/// Input for [`AutomationRule::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    /// Display name.
    pub name: String,
    /// Event that fires the rule.
    pub trigger: TriggerKind,
    /// Conditions that must all hold.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Steps to run.
    pub actions: Vec<Action>,
    /// Whether the rule starts enabled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// A tenant's automation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    id: RuleId,
    name: String,
    trigger: TriggerKind,
    conditions: Vec<Condition>,
    actions: Vec<Action>,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    revision: u32,
}

impl Revisioned for AutomationRule {
    fn revision(&self) -> u32 {
        self.revision
    }

    fn set_revision(&mut self, revision: u32) {
        self.revision = revision;
    }
}

impl AutomationRule {
    /// Validate a draft into a rule.
    pub fn create(
        id: RuleId,
        draft: RuleDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, AutomationError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AutomationError::EmptyName);
        }
        if draft.actions.is_empty() {
            return Err(AutomationError::NoActions);
        }
        if let Some(index) = draft
            .conditions
            .iter()
            .position(|condition| condition.field.trim().is_empty())
        {
            return Err(AutomationError::EmptyConditionField(index));
        }
        for (index, action) in draft.actions.iter().enumerate() {
            action.validate(index)?;
        }
        Ok(Self {
            id,
            name: name.to_owned(),
            trigger: draft.trigger,
            conditions: draft.conditions,
            actions: draft.actions,
            enabled: draft.enabled,
            created_at: now,
            updated_at: now,
            revision: 0,
        })
    }

    /// Rule identifier.
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Firing event.
    pub const fn trigger(&self) -> TriggerKind {
        self.trigger
    }

    /// Conditions over the payload.
    pub fn conditions(&self) -> &[Condition] {
        self.conditions.as_slice()
    }

    /// Configured actions.
    pub fn actions(&self) -> &[Action] {
        self.actions.as_slice()
    }

    /// Whether the rule fires.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Creation time.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Switch the rule on or off.
    pub fn set_enabled(&mut self, enabled: bool, now: DateTime<Utc>) {
        self.enabled = enabled;
        self.updated_at = now;
    }

    /// Whether this rule fires for `event`.
    pub fn matches(&self, event: &AutomationEvent) -> bool {
        self.enabled
            && self.trigger == event.trigger
            && self
                .conditions
                .iter()
                .all(|condition| condition.holds(&event.payload))
    }

    /// Render every action for a matching event.
    pub fn dispatches(&self, event: &AutomationEvent) -> Vec<DispatchedAction> {
        self.actions
            .iter()
            .map(|action| DispatchedAction {
                rule_id: self.id,
                rule_name: self.name.clone(),
                trigger: event.trigger,
                action: action.render(&event.payload),
            })
            .collect()
    }
}
