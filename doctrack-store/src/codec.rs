//! The value-type tag and the string codec behind it.
//!
//! Every persisted value is a string plus a [`ValueType`]. The tag is chosen
//! on write by a fixed precedence and is always sufficient to invert the
//! serialization on read:
//!
//! | value                           | tag       | stored as            |
//! |---------------------------------|-----------|----------------------|
//! | `Boolean`                       | `boolean` | `"true"` / `"false"` |
//! | `Number`                        | `number`  | shortest decimal     |
//! | `Date`, or ISO-shaped `Text`    | `date`    | ISO-8601             |
//! | `Json`                          | `json`    | compact JSON         |
//! | anything else                   | `string`  | as is                |

use std::fmt;
use std::str::FromStr;

use doctrack_fields::{format_number, DateValue, FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// How a stored string must be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Date,
    Json,
    Boolean,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
            ValueType::Date => "date",
            ValueType::Json => "json",
            ValueType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueType::String),
            "number" => Ok(ValueType::Number),
            "date" => Ok(ValueType::Date),
            "json" => Ok(ValueType::Json),
            "boolean" => Ok(ValueType::Boolean),
            other => Err(format!("unknown value type: {other}")),
        }
    }
}

/// A serialized value together with its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValue {
    pub value_type: ValueType,
    pub value: String,
}

/// Pick the tag for `value`. Empty values are never stored and get `None`.
///
/// `hint` is the field's declared kind when the registry knows it. An
/// ISO-shaped string is only promoted to a date when the field is a date
/// field or its kind is unknown.
pub fn infer_value_type(value: &FieldValue, hint: Option<&FieldType>) -> Option<ValueType> {
    if value.is_empty() {
        return None;
    }
    let value_type = match value {
        FieldValue::Null => return None,
        FieldValue::Boolean(_) => ValueType::Boolean,
        FieldValue::Number(_) => ValueType::Number,
        FieldValue::Date(_) => ValueType::Date,
        FieldValue::Text(s)
            if hint.is_none_or(|t| matches!(t, FieldType::Date))
                && DateValue::parse_iso(s).is_some() =>
        {
            ValueType::Date
        }
        FieldValue::Json(_) => ValueType::Json,
        FieldValue::Text(_) => ValueType::String,
    };
    trace!(%value_type, kind = hint.map(FieldType::kind_name), "inferred value type");
    Some(value_type)
}

/// Serialize `value` for storage. `None` for empty values.
pub fn encode(value: &FieldValue, hint: Option<&FieldType>) -> Option<EncodedValue> {
    let value_type = infer_value_type(value, hint)?;
    let encoded = match (value_type, value) {
        (ValueType::Boolean, FieldValue::Boolean(b)) => b.to_string(),
        (ValueType::Number, FieldValue::Number(n)) => format_number(*n),
        (ValueType::Date, FieldValue::Date(d)) => d.to_iso_string(),
        (ValueType::Date, FieldValue::Text(s)) => DateValue::parse_iso(s)
            .map(|d| d.to_iso_string())
            .unwrap_or_else(|| s.clone()),
        (ValueType::Json, FieldValue::Json(v)) => v.to_string(),
        (_, other) => other.coerce_string(),
    };
    Some(EncodedValue {
        value_type,
        value: encoded,
    })
}

/// Invert [`encode`]. `None` when `raw` is not a valid payload for the tag.
pub fn decode(value_type: ValueType, raw: &str) -> Option<FieldValue> {
    match value_type {
        ValueType::String => Some(FieldValue::Text(raw.to_string())),
        ValueType::Boolean => match raw {
            "true" => Some(FieldValue::Boolean(true)),
            "false" => Some(FieldValue::Boolean(false)),
            _ => None,
        },
        ValueType::Number => raw.trim().parse::<f64>().ok().map(FieldValue::Number),
        ValueType::Date => DateValue::parse_iso(raw).map(FieldValue::Date),
        ValueType::Json => serde_json::from_str(raw).ok().map(FieldValue::Json),
    }
}

/// Decode a stored row, degrading to the raw string when the tag is unknown
/// or the payload does not match it.
pub fn decode_lossy(field_key: &str, value_type: &str, raw: &str) -> FieldValue {
    let decoded = value_type
        .parse::<ValueType>()
        .ok()
        .and_then(|t| decode(t, raw));
    decoded.unwrap_or_else(|| {
        warn!(field = %field_key, %value_type, "stored value does not match its type, returning raw string");
        FieldValue::Text(raw.to_string())
    })
}
