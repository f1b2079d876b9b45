//! Dynamic field values.
//!
//! A document's field values live in a [`FieldValues`] map keyed by
//! `field_key`. Values arrive from form input, OCR pre-fill, or the attribute
//! store, and serialize as plain JSON so the rendering layer can pass them
//! through untouched.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Current values for one document, keyed by `field_key`.
pub type FieldValues = HashMap<String, FieldValue>;

/// `YYYY-MM-DD`, optionally followed by a time and an offset.
static ISO_DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d{1,9})?)?(?:Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("ISO date shape regex")
});

/// A timestamp with minutes and an offset but no seconds, e.g. `2024-01-15T10:30Z`.
static MINUTE_INSTANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2})(Z|[+-]\d{2}:?\d{2})$")
        .expect("minute instant regex")
});

/// Non-ISO layouts accepted when a date field is validated.
const LENIENT_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// A calendar date or timestamp, kept at the precision it was entered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateValue {
    /// `2024-01-15`
    Day(NaiveDate),
    /// `2024-01-15T10:30:00` with no offset
    Local(NaiveDateTime),
    /// `2024-01-15T10:30:00Z` or with an explicit offset
    Instant(DateTime<FixedOffset>),
}

impl DateValue {
    /// Parse a string that is shaped like an ISO-8601 date or timestamp.
    ///
    /// Returns `None` when the shape does not match, when the components are
    /// out of range (e.g. `2024-13-45`), or when the text carries surrounding
    /// whitespace.
    pub fn parse_iso(s: &str) -> Option<Self> {
        if !ISO_DATE_SHAPE.is_match(s) {
            return None;
        }
        if s.len() == 10 {
            return NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(DateValue::Day);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(DateValue::Instant(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Some(DateValue::Instant(dt));
            }
        }
        if let Some(dt) = parse_minute_instant(s) {
            return Some(DateValue::Instant(dt));
        }
        for fmt in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(DateValue::Local(dt));
            }
        }
        None
    }

    /// Parse ISO input first, then a handful of common written layouts.
    /// Surrounding whitespace is ignored.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::parse_iso(s).or_else(|| {
            LENIENT_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(DateValue::Day)
        })
    }

    /// Canonical ISO-8601 text. `parse_iso` inverts this exactly.
    pub fn to_iso_string(&self) -> String {
        match self {
            DateValue::Day(d) => d.format("%Y-%m-%d").to_string(),
            DateValue::Local(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            DateValue::Instant(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    /// Milliseconds since the Unix epoch. Days and local times are read as UTC.
    pub fn timestamp_millis(&self) -> i64 {
        match self {
            DateValue::Day(d) => d
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or_default(),
            DateValue::Local(dt) => dt.and_utc().timestamp_millis(),
            DateValue::Instant(dt) => dt.timestamp_millis(),
        }
    }
}

/// Fill in zero seconds and hand the result to the RFC 3339 parser.
fn parse_minute_instant(s: &str) -> Option<DateTime<FixedOffset>> {
    let caps = MINUTE_INSTANT.captures(s)?;
    let offset = match &caps[3] {
        "Z" => "Z".to_string(),
        other => {
            let digits = other.replace(':', "");
            format!("{}:{}", &digits[..3], &digits[3..])
        }
    };
    DateTime::parse_from_rfc3339(&format!("{}T{}:00{}", &caps[1], &caps[2], offset)).ok()
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

/// A single field value.
///
/// JSON input maps onto the variants directly: `null`, booleans, numbers and
/// strings become `Null`, `Boolean`, `Number` and `Text`; arrays and objects
/// become `Json`. `Date` is produced by Rust callers and by the attribute
/// store when it reads back a date-tagged row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum FieldValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    Date(DateValue),
    Text(String),
    Json(serde_json::Value),
}

impl FieldValue {
    /// `null`, blank text, or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Json(serde_json::Value::Array(items)) => items.is_empty(),
            FieldValue::Json(serde_json::Value::Null) => true,
            FieldValue::Boolean(_)
            | FieldValue::Number(_)
            | FieldValue::Date(_)
            | FieldValue::Json(_) => false,
        }
    }

    /// String coercion used by length, pattern and substring checks.
    pub fn coerce_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => d.to_iso_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Json(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| FieldValue::from(item.clone()).coerce_string())
                .collect::<Vec<_>>()
                .join(","),
            FieldValue::Json(serde_json::Value::String(s)) => s.clone(),
            FieldValue::Json(other) => other.to_string(),
        }
    }

    /// Numeric coercion. `None` stands for NaN: any comparison with it is false.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            FieldValue::Null => None,
            FieldValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Number(n) if n.is_nan() => None,
            FieldValue::Number(n) => Some(*n),
            FieldValue::Date(d) => Some(d.timestamp_millis() as f64),
            FieldValue::Text(s) => parse_number(s),
            FieldValue::Json(serde_json::Value::Number(n)) => n.as_f64(),
            FieldValue::Json(serde_json::Value::String(s)) => parse_number(s),
            FieldValue::Json(_) => None,
        }
    }

    /// Borrow the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Render a number the way a JavaScript string conversion would: integers
/// carry no trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        n.to_string()
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s {
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => s.parse::<f64>().ok().filter(|n| !n.is_nan()),
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Boolean(b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => FieldValue::Number(f),
                None => FieldValue::Text(n.to_string()),
            },
            serde_json::Value::String(s) => FieldValue::Text(s),
            other => FieldValue::Json(other),
        }
    }
}

impl From<FieldValue> for serde_json::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Boolean(b) => serde_json::Value::Bool(b),
            FieldValue::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Date(d) => serde_json::Value::String(d.to_iso_string()),
            FieldValue::Text(s) => serde_json::Value::String(s),
            FieldValue::Json(v) => v,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<DateValue> for FieldValue {
    fn from(d: DateValue) -> Self {
        FieldValue::Date(d)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        FieldValue::Date(DateValue::Day(d))
    }
}
