//! Conditional visibility.
//!
//! A template field may carry a [`Condition`] that decides, from the current
//! value map, whether the field is shown. Resolution is a pure function of
//! the field and the values; it is cheap enough to run for every field on
//! every keystroke.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::template::DocumentTypeField;
use crate::value::{FieldValue, FieldValues};

/// Comparison applied between the controller's value and the comparand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    /// Any operator name this build does not know. Evaluates to visible.
    Unrecognized(String),
}

impl Operator {
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Contains => "contains",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
            Operator::Unrecognized(name) => name,
        }
    }
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "equals" => Operator::Equals,
            "not_equals" => Operator::NotEquals,
            "contains" => Operator::Contains,
            "greater_than" => Operator::GreaterThan,
            "less_than" => Operator::LessThan,
            _ => Operator::Unrecognized(name),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_show_if() -> bool {
    true
}

/// A single-controller predicate.
///
/// `show_if` inverts the result, not the predicate: with `show_if: false`
/// the field is visible exactly when the comparison does not hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalLogic {
    pub field_key: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default = "default_show_if")]
    pub show_if: bool,
}

impl ConditionalLogic {
    pub fn new(field_key: impl Into<String>, operator: Operator, value: impl Into<FieldValue>) -> Self {
        Self {
            field_key: field_key.into(),
            operator,
            value: value.into(),
            show_if: true,
        }
    }

    /// Flip polarity: show when the comparison does not hold.
    pub fn hide_if(mut self) -> Self {
        self.show_if = false;
        self
    }

    /// Whether the dependent field is visible for `values`.
    pub fn evaluate(&self, values: &FieldValues) -> bool {
        let controller = values.get(&self.field_key).unwrap_or(&FieldValue::Null);
        let holds = match &self.operator {
            Operator::Equals => strict_equals(controller, &self.value),
            Operator::NotEquals => !strict_equals(controller, &self.value),
            Operator::Contains => contains(controller, &self.value),
            Operator::GreaterThan => compare(controller, &self.value, |a, b| a > b),
            Operator::LessThan => compare(controller, &self.value, |a, b| a < b),
            Operator::Unrecognized(_) => return true,
        };
        holds == self.show_if
    }
}

/// A visibility condition: a single predicate or a boolean tree of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    Not { not: Box<Condition> },
    Rule(ConditionalLogic),
}

impl Condition {
    pub fn evaluate(&self, values: &FieldValues) -> bool {
        match self {
            Condition::All { all } => all.iter().all(|c| c.evaluate(values)),
            Condition::Any { any } => any.iter().any(|c| c.evaluate(values)),
            Condition::Not { not } => !not.evaluate(values),
            Condition::Rule(rule) => rule.evaluate(values),
        }
    }

    /// Every controller `field_key` referenced anywhere in the tree.
    pub fn controllers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_controllers(&mut out);
        out
    }

    fn collect_controllers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::All { all } => all.iter().for_each(|c| c.collect_controllers(out)),
            Condition::Any { any } => any.iter().for_each(|c| c.collect_controllers(out)),
            Condition::Not { not } => not.collect_controllers(out),
            Condition::Rule(rule) => out.push(&rule.field_key),
        }
    }
}

impl From<ConditionalLogic> for Condition {
    fn from(rule: ConditionalLogic) -> Self {
        Condition::Rule(rule)
    }
}

/// Resolve a template field's visibility against the current values.
pub fn is_visible(field: &DocumentTypeField, values: &FieldValues) -> bool {
    field
        .conditional_logic
        .as_ref()
        .is_none_or(|condition| condition.evaluate(values))
}

/// Same variant and same payload. Numbers never equal text.
fn strict_equals(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Null, FieldValue::Null) => true,
        (FieldValue::Boolean(x), FieldValue::Boolean(y)) => x == y,
        (FieldValue::Number(x), FieldValue::Number(y)) => x == y,
        (FieldValue::Text(x), FieldValue::Text(y)) => x == y,
        (FieldValue::Date(x), FieldValue::Date(y)) => x == y,
        (FieldValue::Json(x), FieldValue::Json(y)) => x == y,
        _ => false,
    }
}

/// Array membership for list values, substring match on string coercion otherwise.
fn contains(controller: &FieldValue, needle: &FieldValue) -> bool {
    match controller {
        FieldValue::Json(serde_json::Value::Array(items)) => items
            .iter()
            .any(|item| strict_equals(&FieldValue::from(item.clone()), needle)),
        other => other.coerce_string().contains(&needle.coerce_string()),
    }
}

fn compare(a: &FieldValue, b: &FieldValue, op: impl Fn(f64, f64) -> bool) -> bool {
    match (a.coerce_number(), b.coerce_number()) {
        (Some(x), Some(y)) => op(x, y),
        _ => false,
    }
}
