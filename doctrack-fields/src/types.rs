//! Core field types for the field registry.
//!
//! All types serialize to/from YAML via serde. A field definition describes
//! one named, typed piece of document data together with its declarative
//! validation rules. Templates reference definitions by `field_key`.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::FieldValue;

/// A single option in a dropdown, radio group or checkbox group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectOption {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl SelectOption {
    /// The label shown to the user, falling back to the stored value.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.value)
    }
}

/// The kind of a field. Determines what shape the value takes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldType {
    Text,
    Textarea {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u32>,
    },
    Number,
    Currency {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    Date,
    Dropdown {
        options: Vec<SelectOption>,
    },
    Radio {
        options: Vec<SelectOption>,
    },
    /// A single box when `options` is empty, a checkbox group otherwise.
    Checkbox {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        options: Vec<SelectOption>,
    },
    Address,
    Phone,
    Email,
    /// Vehicle identification number.
    Vin,
    /// Machine readable zone of a travel document.
    Mrz,
}

impl FieldType {
    /// Stable lowercase name, also used as the stored `field_type` column.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea { .. } => "textarea",
            FieldType::Number => "number",
            FieldType::Currency { .. } => "currency",
            FieldType::Date => "date",
            FieldType::Dropdown { .. } => "dropdown",
            FieldType::Radio { .. } => "radio",
            FieldType::Checkbox { .. } => "checkbox",
            FieldType::Address => "address",
            FieldType::Phone => "phone",
            FieldType::Email => "email",
            FieldType::Vin => "vin",
            FieldType::Mrz => "mrz",
        }
    }

    /// Kinds whose values are checked as numbers with `min`/`max` bounds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Currency { .. })
    }

    /// The enumerable options, in display order. Empty for free-form kinds.
    pub fn options(&self) -> &[SelectOption] {
        match self {
            FieldType::Dropdown { options }
            | FieldType::Radio { options }
            | FieldType::Checkbox { options } => options,
            FieldType::Text
            | FieldType::Textarea { .. }
            | FieldType::Number
            | FieldType::Currency { .. }
            | FieldType::Date
            | FieldType::Address
            | FieldType::Phone
            | FieldType::Email
            | FieldType::Vin
            | FieldType::Mrz => &[],
        }
    }
}

/// Input widget hint for the rendering layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Editor {
    Text,
    Multiline,
    Numeric,
    DatePicker,
    Select,
    RadioGroup,
    Checkbox,
    Address,
    Phone,
    Email,
    Scan,
}

/// Named value formats checked alongside the type-specific rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ValueFormat {
    Email,
    Phone,
    Vin,
    Mrz,
    Uppercase,
    Alphanumeric,
}

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\s().-]{5,19}$").expect("phone regex"));
static VIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)[A-HJ-NPR-Z0-9]{17}$").expect("vin regex"));
static MRZ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z0-9<]{30,44}(?:\r?\n[A-Z0-9<]{30,44}){1,2}$").expect("mrz regex")
});
static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^a-z]*$").expect("uppercase regex"));
static ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]*$").expect("alphanumeric regex"));

impl ValueFormat {
    /// Whether `text` satisfies the format.
    pub fn matches(&self, text: &str) -> bool {
        let re = match self {
            ValueFormat::Email => &EMAIL,
            ValueFormat::Phone => &PHONE,
            ValueFormat::Vin => &VIN,
            ValueFormat::Mrz => &MRZ,
            ValueFormat::Uppercase => &UPPERCASE,
            ValueFormat::Alphanumeric => &ALPHANUMERIC,
        };
        re.is_match(text)
    }
}

/// A compiled regular expression rule. Serializes as its source text;
/// deserializing an expression that does not compile is an error.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Outcome of a custom validation predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomVerdict {
    Valid,
    /// Reported with the generic "is invalid" message.
    Invalid,
    /// Reported verbatim.
    Message(String),
}

impl From<bool> for CustomVerdict {
    fn from(ok: bool) -> Self {
        if ok {
            CustomVerdict::Valid
        } else {
            CustomVerdict::Invalid
        }
    }
}

type Predicate = dyn Fn(&FieldValue) -> CustomVerdict + Send + Sync;

/// A custom validation predicate, attached through the registry builder.
#[derive(Clone)]
pub struct CustomRule(Arc<Predicate>);

impl CustomRule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValue) -> CustomVerdict + Send + Sync + 'static,
    {
        CustomRule(Arc::new(f))
    }

    pub fn check(&self, value: &FieldValue) -> CustomVerdict {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomRule(..)")
    }
}

impl PartialEq for CustomRule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Declarative validation rules for a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ValueFormat>,
    #[serde(skip)]
    pub custom: Option<CustomRule>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }
}

/// A field definition: the complete schema for a single named attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub field_key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "ValidationRules::is_empty")]
    pub validation_rules: ValidationRules,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Editor>,
}

impl FieldDefinition {
    /// Minimal definition with no rules. Mostly useful for tests and
    /// programmatic registries.
    pub fn new(field_key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field_key: field_key.into(),
            field_type,
            label: label.into(),
            description: None,
            validation_rules: ValidationRules::default(),
            is_repeatable: false,
            placeholder: None,
            help_text: None,
            editor: None,
        }
    }

    /// Attach validation rules.
    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.validation_rules = rules;
        self
    }

    /// Ordered value/label/icon list for enumerable kinds.
    pub fn default_options(&self) -> &[SelectOption] {
        self.field_type.options()
    }

    /// Infer editor from field type if not explicitly set.
    pub fn effective_editor(&self) -> Editor {
        if let Some(e) = self.editor {
            return e;
        }
        match &self.field_type {
            FieldType::Text => Editor::Text,
            FieldType::Textarea { .. } => Editor::Multiline,
            FieldType::Number | FieldType::Currency { .. } => Editor::Numeric,
            FieldType::Date => Editor::DatePicker,
            FieldType::Dropdown { .. } => Editor::Select,
            FieldType::Radio { .. } => Editor::RadioGroup,
            FieldType::Checkbox { .. } => Editor::Checkbox,
            FieldType::Address => Editor::Address,
            FieldType::Phone => Editor::Phone,
            FieldType::Email => Editor::Email,
            FieldType::Vin | FieldType::Mrz => Editor::Scan,
        }
    }

    /// Check the rule invariants: bounds ordered, numeric bounds only on
    /// numeric kinds. Pattern compilation is already enforced by [`Pattern`].
    pub fn check_rules(&self) -> std::result::Result<(), String> {
        let rules = &self.validation_rules;
        if let (Some(min), Some(max)) = (rules.min, rules.max) {
            if min > max {
                return Err(format!("min ({min}) is greater than max ({max})"));
            }
        }
        if let (Some(min), Some(max)) = (rules.min_length, rules.max_length) {
            if min > max {
                return Err(format!(
                    "min_length ({min}) is greater than max_length ({max})"
                ));
            }
        }
        if (rules.min.is_some() || rules.max.is_some()) && !self.field_type.is_numeric() {
            return Err(format!(
                "min/max only apply to numeric fields, not '{}'",
                self.field_type.kind_name()
            ));
        }
        Ok(())
    }
}
