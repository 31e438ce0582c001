//! Payload lookups, condition evaluation, and placeholder rendering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field equals the value.
    Eq,
    /// Field is present and differs from the value.
    NotEq,
    /// Numeric greater-than.
    Gt,
    /// Numeric greater-than-or-equal.
    Gte,
    /// Numeric less-than.
    Lt,
    /// Numeric less-than-or-equal.
    Lte,
    /// Substring of a string field, or member of an array field.
    Contains,
    /// Field is present and not null.
    Exists,
}

/// Test against one field of an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Dotted path into the payload, e.g. `order.total`.
    pub field: String,
    /// Comparison to apply.
    pub operator: ConditionOperator,
    /// Operand; ignored by `exists`.
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// Whether the payload satisfies this condition.
    ///
    /// A missing field satisfies nothing. Operands of different JSON types
    /// never match.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use storefront::domain::{Condition, ConditionOperator};
    ///
    /// let condition = Condition {
    ///     field: "order.total".to_owned(),
    ///     operator: ConditionOperator::Gte,
    ///     value: json!(100),
    /// };
    /// assert!(condition.holds(&json!({ "order": { "total": 250 } })));
    /// assert!(!condition.holds(&json!({ "order": { "total": "250" } })));
    /// ```
    pub fn holds(&self, payload: &Value) -> bool {
        let Some(actual) = lookup(payload, &self.field) else {
            return false;
        };
        match self.operator {
            ConditionOperator::Exists => !actual.is_null(),
            ConditionOperator::Eq => json_eq(actual, &self.value),
            ConditionOperator::NotEq => {
                same_kind(actual, &self.value) && !json_eq(actual, &self.value)
            }
            ConditionOperator::Gt => {
                compare_numbers(actual, &self.value) == Some(Ordering::Greater)
            }
            ConditionOperator::Gte => matches!(
                compare_numbers(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            ConditionOperator::Lt => compare_numbers(actual, &self.value) == Some(Ordering::Less),
            ConditionOperator::Lte => matches!(
                compare_numbers(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            ConditionOperator::Contains => contains(actual, &self.value),
        }
    }
}

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(payload, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}

/// Replace `{{ path }}` placeholders with payload values.
///
/// Missing or null values render as empty text; strings render without
/// quotes; other values render as JSON. An unterminated `{{` is kept as is.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use storefront::domain::render_template;
///
/// let payload = json!({ "customer": { "name": "Ada" }, "points": 120 });
/// assert_eq!(
///     render_template("Hi {{customer.name}}, you have {{ points }} points{{missing}}", &payload),
///     "Hi Ada, you have 120 points"
/// );
/// ```
pub fn render_template(template: &str, payload: &Value) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let (before, after_open) = rest.split_at(start);
        rendered.push_str(before);
        let inner = after_open.get(2..).unwrap_or_default();
        let Some(end) = inner.find("}}") else {
            rendered.push_str(after_open);
            return rendered;
        };
        let (path, tail) = inner.split_at(end);
        rendered.push_str(&value_text(lookup(payload, path.trim())));
        rest = tail.get(2..).unwrap_or_default();
    }
    rendered.push_str(rest);
    rendered
}

/// Text form of a looked-up value, empty when absent.
pub fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn same_kind(left: &Value, right: &Value) -> bool {
    std::mem::discriminant(left) == std::mem::discriminant(right)
}

fn json_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        _ => left == right,
    }
}

fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                return Some(x.cmp(&y));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        _ => None,
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(text), Value::String(fragment)) => text.contains(fragment.as_str()),
        (Value::Array(items), _) => items.iter().any(|item| json_eq(item, needle)),
        _ => false,
    }
}
