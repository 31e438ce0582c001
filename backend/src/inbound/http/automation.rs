//! Automation rule handlers.
//!
//! ```text
//! GET  /api/v1/automation/rules
//! POST /api/v1/automation/rules
//! POST /api/v1/automation/rules/{id}/enabled
//! POST /api/v1/automation/events
//! ```

use actix_web::{HttpResponse, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{
    Action, AutomationEvent, AutomationRule, Condition, DispatchedAction, RenderedAction,
    RuleDraft, RuleId, TriggerKind,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const RULE_ID: FieldName = FieldName::new("ruleId");

const fn enabled_by_default() -> bool {
    true
}

/// Automation rule as returned to clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleResponse {
    /// Rule identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Event kind the rule listens for.
    #[schema(value_type = String, example = "order_paid")]
    pub trigger: TriggerKind,
    /// Conditions that must all hold: `{field, operator, value}`.
    #[schema(value_type = Vec<Object>)]
    pub conditions: Vec<Condition>,
    /// Actions tagged by `type`: send_email, tag_customer, create_task, webhook.
    #[schema(value_type = Vec<Object>)]
    pub actions: Vec<Action>,
    /// Disabled rules never fire.
    pub enabled: bool,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
}

impl From<AutomationRule> for RuleResponse {
    fn from(value: AutomationRule) -> Self {
        Self {
            id: value.id().to_string(),
            name: value.name().to_owned(),
            trigger: value.trigger(),
            conditions: value.conditions().to_vec(),
            actions: value.actions().to_vec(),
            enabled: value.enabled(),
            created_at: value.created_at(),
        }
    }
}

/// Every rule of the tenant.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleListResponse {
    pub rules: Vec<RuleResponse>,
}

/// Request payload for defining a rule.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleBody {
    #[schema(example = "Thank big spenders")]
    pub name: String,
    #[schema(value_type = String, example = "order_paid")]
    pub trigger: TriggerKind,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub conditions: Vec<Condition>,
    #[schema(value_type = Vec<Object>)]
    pub actions: Vec<Action>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl From<CreateRuleBody> for RuleDraft {
    fn from(value: CreateRuleBody) -> Self {
        Self {
            name: value.name,
            trigger: value.trigger,
            conditions: value.conditions,
            actions: value.actions,
            enabled: value.enabled,
        }
    }
}

/// Request payload for switching a rule on or off.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetEnabledBody {
    pub enabled: bool,
}

/// A business event to run rules against.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    /// Kind of event that occurred.
    #[schema(value_type = String, example = "order_paid")]
    pub trigger: TriggerKind,
    /// Event data that conditions and templates read from.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

/// An action produced by a matching rule.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedActionResponse {
    /// Rule that matched.
    pub rule_id: String,
    /// Name of the matching rule.
    pub rule_name: String,
    /// Event kind that fired the rule.
    #[schema(value_type = String)]
    pub trigger: TriggerKind,
    /// Action with placeholders resolved, tagged by `type`.
    #[schema(value_type = Object)]
    pub action: RenderedAction,
}

impl From<DispatchedAction> for DispatchedActionResponse {
    fn from(value: DispatchedAction) -> Self {
        Self {
            rule_id: value.rule_id.to_string(),
            rule_name: value.rule_name,
            trigger: value.trigger,
            action: value.action,
        }
    }
}

/// Actions dispatched for an event.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    pub dispatched: Vec<DispatchedActionResponse>,
}

/// List the tenant's rules in creation order.
#[utoipa::path(
    get,
    path = "/api/v1/automation/rules",
    responses(
        (status = 200, description = "Automation rules", body = RuleListResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["automation"],
    operation_id = "listAutomationRules"
)]
#[get("/automation/rules")]
pub async fn list_rules(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<RuleListResponse>> {
    let ctx = session.require_tenant()?;
    let rules = state.automation.list_rules(&ctx).await?;
    Ok(web::Json(RuleListResponse {
        rules: rules.into_iter().map(RuleResponse::from).collect(),
    }))
}

/// Define a new rule.
#[utoipa::path(
    post,
    path = "/api/v1/automation/rules",
    request_body = CreateRuleBody,
    responses(
        (status = 201, description = "Rule created", body = RuleResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["automation"],
    operation_id = "createAutomationRule"
)]
#[post("/automation/rules")]
pub async fn create_rule(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateRuleBody>,
) -> ApiResult<HttpResponse> {
    let ctx = session.require_tenant()?;
    let rule = state
        .automation
        .create_rule(&ctx, payload.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(RuleResponse::from(rule)))
}

/// Switch a rule on or off.
#[utoipa::path(
    post,
    path = "/api/v1/automation/rules/{id}/enabled",
    params(("id" = String, Path, description = "Rule identifier")),
    request_body = SetEnabledBody,
    responses(
        (status = 200, description = "Rule updated", body = RuleResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["automation"],
    operation_id = "setAutomationRuleEnabled"
)]
#[post("/automation/rules/{id}/enabled")]
pub async fn set_rule_enabled(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<SetEnabledBody>,
) -> ApiResult<web::Json<RuleResponse>> {
    let ctx = session.require_tenant()?;
    let id: RuleId = parse_id(&path, RULE_ID)?;
    let rule = state
        .automation
        .set_enabled(&ctx, id, payload.enabled)
        .await?;
    Ok(web::Json(rule.into()))
}

/// Run matching rules for a business event.
#[utoipa::path(
    post,
    path = "/api/v1/automation/events",
    request_body = EventBody,
    responses(
        (status = 200, description = "Dispatched actions", body = EvaluationResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["automation"],
    operation_id = "evaluateAutomationEvent"
)]
#[post("/automation/events")]
pub async fn evaluate_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<EventBody>,
) -> ApiResult<web::Json<EvaluationResponse>> {
    let ctx = session.require_tenant()?;
    let EventBody { trigger, payload } = payload.into_inner();
    let dispatched = state
        .automation
        .evaluate(&ctx, AutomationEvent { trigger, payload })
        .await?;
    Ok(web::Json(EvaluationResponse {
        dispatched: dispatched
            .into_iter()
            .map(DispatchedActionResponse::from)
            .collect(),
    }))
}
