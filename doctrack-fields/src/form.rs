//! Form state for one document being edited.
//!
//! [`DocumentForm`] binds a template to the current value map and exposes
//! what the rendering layer needs: the visible sections, a validation map,
//! and the values to hand to the attribute store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sections::{compose_sections, Section};
use crate::template::{DocumentTypeField, DocumentTypeTemplate};
use crate::validation::{validate_all_fields, ValidationError};
use crate::value::{FieldValue, FieldValues};
use crate::visibility::is_visible;

/// A value pulled from a scanned document, with the extractor's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedValue {
    pub value: String,
    #[serde(default)]
    pub confidence: f32,
}

/// Field values extracted by OCR, keyed by `field_key`.
pub type ExtractedFields = HashMap<String, ExtractedValue>;

/// The editable state of one document's typed fields.
#[derive(Debug, Clone)]
pub struct DocumentForm {
    template: Arc<DocumentTypeTemplate>,
    values: FieldValues,
}

impl DocumentForm {
    pub fn new(template: Arc<DocumentTypeTemplate>) -> Self {
        Self::with_values(template, FieldValues::new())
    }

    pub fn with_values(template: Arc<DocumentTypeTemplate>, values: FieldValues) -> Self {
        Self { template, values }
    }

    pub fn template(&self) -> &DocumentTypeTemplate {
        &self.template
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn value(&self, field_key: &str) -> Option<&FieldValue> {
        self.values.get(field_key)
    }

    pub fn set_value(&mut self, field_key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field_key.into(), value.into());
    }

    pub fn clear_value(&mut self, field_key: &str) -> Option<FieldValue> {
        self.values.remove(field_key)
    }

    /// Pre-fill from OCR output. Extracted values are written exactly like
    /// typed input; keys the template does not use and blank values are
    /// skipped. Returns how many values were written.
    pub fn apply_extraction(&mut self, extracted: &ExtractedFields) -> usize {
        let mut applied = 0;
        for (key, extracted) in extracted {
            if self.template.field(key).is_none() || extracted.value.trim().is_empty() {
                continue;
            }
            debug!(field = %key, confidence = extracted.confidence, "applying extracted value");
            self.values
                .insert(key.clone(), FieldValue::Text(extracted.value.clone()));
            applied += 1;
        }
        applied
    }

    /// Fields currently visible, in declaration order.
    pub fn visible_fields(&self) -> Vec<&DocumentTypeField> {
        self.template
            .fields()
            .iter()
            .filter(|f| is_visible(f, &self.values))
            .collect()
    }

    /// Visible fields grouped by section and ordered for display.
    pub fn sections(&self) -> Vec<Section<'_>> {
        compose_sections(&self.template, &self.values)
    }

    /// Validation failures for the visible fields.
    pub fn errors(&self) -> Vec<ValidationError> {
        validate_all_fields(self.visible_fields(), &self.values)
    }

    /// `field_key → message` for every visible field that fails validation.
    pub fn validate(&self) -> BTreeMap<String, String> {
        self.errors()
            .into_iter()
            .map(|e| (e.field_key, e.message))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldRegistry;
    use crate::template::{DocumentCategory, TemplateDef, TemplateFieldDef};
    use crate::types::{FieldDefinition, FieldType};
    use crate::visibility::{ConditionalLogic, Operator};

    fn template() -> Arc<DocumentTypeTemplate> {
        let registry = FieldRegistry::builder()
            .field(FieldDefinition::new("kind", "Kind", FieldType::Text))
            .field(FieldDefinition::new("detail", "Detail", FieldType::Text))
            .field(FieldDefinition::new("number", "Number", FieldType::Text))
            .build()
            .unwrap();
        let def = TemplateDef {
            type_key: "t".into(),
            name: "T".into(),
            category: DocumentCategory::Other,
            description: None,
            icon: None,
            fields: vec![
                TemplateFieldDef {
                    field_key: "kind".into(),
                    is_required: Some(true),
                    section: "main".into(),
                    display_order: 1,
                    conditional_logic: None,
                },
                TemplateFieldDef {
                    field_key: "detail".into(),
                    is_required: Some(true),
                    section: "main".into(),
                    display_order: 2,
                    conditional_logic: Some(
                        ConditionalLogic::new("kind", Operator::Equals, "detailed").into(),
                    ),
                },
                TemplateFieldDef {
                    field_key: "number".into(),
                    is_required: None,
                    section: "main".into(),
                    display_order: 3,
                    conditional_logic: None,
                },
            ],
        };
        Arc::new(DocumentTypeTemplate::resolve(def, &registry).unwrap())
    }

    #[test]
    fn hidden_required_fields_do_not_block() {
        let mut form = DocumentForm::new(template());
        form.set_value("kind", "simple");
        assert!(form.is_valid());

        form.set_value("kind", "detailed");
        let errors = form.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["detail"], "Detail is required.");
    }

    #[test]
    fn extraction_prefills_known_fields_only() {
        let mut form = DocumentForm::new(template());
        let extracted: ExtractedFields = [
            ("number", ExtractedValue { value: "X99".into(), confidence: 0.42 }),
            ("unknown", ExtractedValue { value: "ignored".into(), confidence: 0.99 }),
            ("kind", ExtractedValue { value: "  ".into(), confidence: 0.9 }),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        assert_eq!(form.apply_extraction(&extracted), 1);
        assert_eq!(form.value("number"), Some(&FieldValue::Text("X99".into())));
        assert!(form.value("unknown").is_none());
        assert!(form.value("kind").is_none());
    }

    #[test]
    fn extraction_overwrites_like_user_input() {
        let mut form = DocumentForm::new(template());
        form.set_value("number", "typed");
        let extracted: ExtractedFields = [(
            "number".to_string(),
            ExtractedValue { value: "scanned".into(), confidence: 0.1 },
        )]
        .into_iter()
        .collect();
        form.apply_extraction(&extracted);
        assert_eq!(form.value("number").and_then(FieldValue::as_text), Some("scanned"));
    }

    #[test]
    fn visible_fields_follow_values() {
        let mut form = DocumentForm::new(template());
        form.set_value("detail", "stale");
        let keys: Vec<_> = form.visible_fields().iter().map(|f| f.field_key()).collect();
        assert_eq!(keys, vec!["kind", "number"]);
        assert_eq!(form.clear_value("detail"), Some(FieldValue::Text("stale".into())));
    }
}
