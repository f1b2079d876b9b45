//! Validation engine.
//!
//! `validate_field` applies the checks in a fixed order and reports the first
//! failure only:
//!
//! 1. required (an empty optional value short-circuits everything else)
//! 2. `min_length` / `max_length` on the string coercion
//! 3. `pattern` on the string coercion
//! 4. type-specific: numeric kinds need a finite number within `min`/`max`,
//!    date kinds need a parseable date, then the named `format`
//! 5. the custom predicate
//!
//! Bad data never produces an `Err`; it produces a message.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::template::DocumentTypeField;
use crate::types::{CustomVerdict, FieldDefinition, FieldType, ValidationRules};
use crate::value::{format_number, DateValue, FieldValue, FieldValues};

/// A per-field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field_key: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_key, self.message)
    }
}

/// Validate one template field. Returns `None` when the value is acceptable.
pub fn validate_field(field: &DocumentTypeField, value: &FieldValue) -> Option<String> {
    validate_value(&field.field, field.is_required, value)
}

/// Validate a value against a bare definition with an explicit required flag.
pub fn validate_value(def: &FieldDefinition, required: bool, value: &FieldValue) -> Option<String> {
    let label = def.label.as_str();
    let rules = &def.validation_rules;

    if value.is_empty() {
        return required.then(|| format!("{label} is required."));
    }

    let text = value.coerce_string();
    let len = text.chars().count();
    if let Some(min) = rules.min_length {
        if len < min {
            return Some(format!("{label} must be at least {min} characters."));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            return Some(format!("{label} must be at most {max} characters."));
        }
    }

    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(&text) {
            return Some(format!("{label} has an invalid format."));
        }
    }

    if let Some(message) = check_kind(&def.field_type, rules, label, value) {
        return Some(message);
    }
    if let Some(format) = rules.format {
        if !format.matches(&text) {
            return Some(format!("{label} has an invalid format."));
        }
    }

    match rules.custom.as_ref().map(|rule| rule.check(value)) {
        None | Some(CustomVerdict::Valid) => None,
        Some(CustomVerdict::Invalid) => Some(format!("{label} is invalid.")),
        Some(CustomVerdict::Message(message)) => Some(message),
    }
}

fn check_kind(
    field_type: &FieldType,
    rules: &ValidationRules,
    label: &str,
    value: &FieldValue,
) -> Option<String> {
    match field_type {
        FieldType::Number | FieldType::Currency { .. } => {
            let Some(n) = value.coerce_number().filter(|n| n.is_finite()) else {
                return Some(format!("{label} must be a valid number."));
            };
            if let Some(min) = rules.min {
                if n < min {
                    return Some(format!("{label} must be at least {}.", format_number(min)));
                }
            }
            if let Some(max) = rules.max {
                if n > max {
                    return Some(format!("{label} must be at most {}.", format_number(max)));
                }
            }
            None
        }
        FieldType::Date => {
            let parseable = match value {
                FieldValue::Date(_) => true,
                FieldValue::Number(n) => n.is_finite(),
                other => DateValue::parse_lenient(&other.coerce_string()).is_some(),
            };
            (!parseable).then(|| format!("{label} must be a valid date."))
        }
        FieldType::Text
        | FieldType::Textarea { .. }
        | FieldType::Dropdown { .. }
        | FieldType::Radio { .. }
        | FieldType::Checkbox { .. }
        | FieldType::Address
        | FieldType::Phone
        | FieldType::Email
        | FieldType::Vin
        | FieldType::Mrz => None,
    }
}

/// Validate every field in `fields` against `values`.
///
/// A key that appears in several sections shares one value. Every occurrence
/// is checked, so a required occurrence applies even after an optional one,
/// and the key is reported at most once, with its first failure.
pub fn validate_all_fields<'a>(
    fields: impl IntoIterator<Item = &'a DocumentTypeField>,
    values: &FieldValues,
) -> Vec<ValidationError> {
    let mut reported = HashSet::new();
    fields
        .into_iter()
        .filter_map(|f| {
            if reported.contains(f.field_key()) {
                return None;
            }
            let value = values.get(f.field_key()).unwrap_or(&FieldValue::Null);
            let message = validate_field(f, value)?;
            reported.insert(f.field_key());
            Some(ValidationError {
                field_key: f.field_key().to_string(),
                message,
            })
        })
        .collect()
}
