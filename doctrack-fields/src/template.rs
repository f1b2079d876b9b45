//! Document type templates.
//!
//! A [`TemplateDef`] is the declarative form read from YAML: a list of field
//! keys with per-template overrides. Building a [`TemplateRegistry`] resolves
//! every key against the [`FieldRegistry`] and fails on the first dangling
//! reference, so every live [`DocumentTypeTemplate`] is internally consistent.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FieldsError, Result};
use crate::registry::FieldRegistry;
use crate::sections::{assemble_sections, Section};
use crate::types::FieldDefinition;
use crate::visibility::Condition;

/// The closed set of document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Identity,
    Travel,
    Certificate,
    Insurance,
    Professional,
    Property,
    Medical,
    Financial,
    Legal,
    Custom,
    Other,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 11] = [
        DocumentCategory::Identity,
        DocumentCategory::Travel,
        DocumentCategory::Certificate,
        DocumentCategory::Insurance,
        DocumentCategory::Professional,
        DocumentCategory::Property,
        DocumentCategory::Medical,
        DocumentCategory::Financial,
        DocumentCategory::Legal,
        DocumentCategory::Custom,
        DocumentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Identity => "identity",
            DocumentCategory::Travel => "travel",
            DocumentCategory::Certificate => "certificate",
            DocumentCategory::Insurance => "insurance",
            DocumentCategory::Professional => "professional",
            DocumentCategory::Property => "property",
            DocumentCategory::Medical => "medical",
            DocumentCategory::Financial => "financial",
            DocumentCategory::Legal => "legal",
            DocumentCategory::Custom => "custom",
            DocumentCategory::Other => "other",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown document category: {s}"))
    }
}

/// One field reference inside a template, as declared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateFieldDef {
    pub field_key: String,
    /// Overrides the definition's `required` rule when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    pub section: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<Condition>,
}

/// A template as declared in YAML, before resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDef {
    pub type_key: String,
    pub name: String,
    pub category: DocumentCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub fields: Vec<TemplateFieldDef>,
}

/// A resolved field reference: the shared definition plus template overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTypeField {
    pub field: Arc<FieldDefinition>,
    pub is_required: bool,
    pub section: String,
    pub display_order: i32,
    pub conditional_logic: Option<Condition>,
}

impl DocumentTypeField {
    pub fn field_key(&self) -> &str {
        &self.field.field_key
    }

    pub fn label(&self) -> &str {
        &self.field.label
    }
}

/// A resolved document type.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTypeTemplate {
    pub type_key: String,
    pub name: String,
    pub category: DocumentCategory,
    pub description: Option<String>,
    pub icon: Option<String>,
    fields: Vec<DocumentTypeField>,
}

impl DocumentTypeTemplate {
    /// Resolve a declared template against the field registry.
    ///
    /// Fails on unknown field keys, on a key repeated within one section, and
    /// on conditions controlled by a field outside the template. A key may
    /// appear in several sections; all occurrences share one value slot.
    pub fn resolve(def: TemplateDef, registry: &FieldRegistry) -> Result<Self> {
        let mut fields = Vec::with_capacity(def.fields.len());
        let mut seen = HashSet::new();

        for f in def.fields {
            let field = registry
                .get(&f.field_key)
                .ok_or_else(|| FieldsError::DanglingFieldReference {
                    type_key: def.type_key.clone(),
                    field_key: f.field_key.clone(),
                })?
                .clone();

            if !seen.insert((f.section.clone(), f.field_key.clone())) {
                return Err(FieldsError::DuplicateTemplateField {
                    type_key: def.type_key,
                    section: f.section,
                    field_key: f.field_key,
                });
            }

            let is_required = f
                .is_required
                .unwrap_or(field.validation_rules.required);
            fields.push(DocumentTypeField {
                field,
                is_required,
                section: f.section,
                display_order: f.display_order,
                conditional_logic: f.conditional_logic,
            });
        }

        let keys: HashSet<&str> = fields.iter().map(|f| f.field_key()).collect();
        for f in &fields {
            let Some(condition) = &f.conditional_logic else {
                continue;
            };
            if let Some(missing) = condition.controllers().into_iter().find(|c| !keys.contains(c)) {
                return Err(FieldsError::DanglingController {
                    type_key: def.type_key.clone(),
                    field_key: f.field_key().to_string(),
                    controller: missing.to_string(),
                });
            }
        }

        Ok(Self {
            type_key: def.type_key,
            name: def.name,
            category: def.category,
            description: def.description,
            icon: def.icon,
            fields,
        })
    }

    /// All field references in declaration order.
    pub fn fields(&self) -> &[DocumentTypeField] {
        &self.fields
    }

    /// First reference to `field_key`, if the template uses it.
    pub fn field(&self, field_key: &str) -> Option<&DocumentTypeField> {
        self.fields.iter().find(|f| f.field_key() == field_key)
    }

    /// All fields grouped by section, ignoring visibility.
    pub fn sections(&self) -> Vec<Section<'_>> {
        assemble_sections(self.fields.iter())
    }
}

/// Immutable registry of document type templates.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<Arc<DocumentTypeTemplate>>,
    index: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Resolve every template against `fields`. Fails fast on the first defect.
    pub fn build(defs: impl IntoIterator<Item = TemplateDef>, fields: &FieldRegistry) -> Result<Self> {
        let mut registry = TemplateRegistry::default();
        for def in defs {
            if registry.index.contains_key(&def.type_key) {
                return Err(FieldsError::DuplicateTemplate {
                    type_key: def.type_key,
                });
            }
            let template = DocumentTypeTemplate::resolve(def, fields)?;
            registry
                .index
                .insert(template.type_key.clone(), registry.templates.len());
            registry.templates.push(Arc::new(template));
        }
        debug!(templates = registry.templates.len(), "template registry built");
        Ok(registry)
    }

    /// Get a template by type key.
    pub fn get_template(&self, type_key: &str) -> Option<&Arc<DocumentTypeTemplate>> {
        self.index.get(type_key).map(|&i| &self.templates[i])
    }

    /// All templates in registration order.
    pub fn list_all(&self) -> &[Arc<DocumentTypeTemplate>] {
        &self.templates
    }

    /// Templates in one category, in registration order.
    pub fn list_by_category(&self, category: DocumentCategory) -> Vec<&Arc<DocumentTypeTemplate>> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
