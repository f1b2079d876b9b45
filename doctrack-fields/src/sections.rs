//! Section composition.
//!
//! Fields are grouped by section name in order of first appearance, and each
//! group is stably sorted by `display_order`. Ties keep declaration order.

use indexmap::IndexMap;

use crate::template::{DocumentTypeField, DocumentTypeTemplate};
use crate::value::FieldValues;
use crate::visibility::is_visible;

/// A named group of fields, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub name: &'a str,
    pub fields: Vec<&'a DocumentTypeField>,
}

/// Group `fields` by section and order each group.
pub fn assemble_sections<'a>(
    fields: impl IntoIterator<Item = &'a DocumentTypeField>,
) -> Vec<Section<'a>> {
    let mut groups: IndexMap<&'a str, Vec<&'a DocumentTypeField>> = IndexMap::new();
    for field in fields {
        groups.entry(field.section.as_str()).or_default().push(field);
    }
    groups
        .into_iter()
        .map(|(name, mut fields)| {
            fields.sort_by_key(|f| f.display_order);
            Section { name, fields }
        })
        .collect()
}

/// Visible fields of `template` for `values`, grouped and ordered.
/// Sections left with no visible field are dropped.
pub fn compose_sections<'a>(
    template: &'a DocumentTypeTemplate,
    values: &FieldValues,
) -> Vec<Section<'a>> {
    assemble_sections(template.fields().iter().filter(|f| is_visible(f, values)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldRegistry;
    use crate::template::{DocumentCategory, TemplateDef, TemplateFieldDef};
    use crate::types::{FieldDefinition, FieldType};
    use crate::visibility::{ConditionalLogic, Operator};

    fn template(fields: &[(&str, &str, i32)]) -> DocumentTypeTemplate {
        let registry = FieldRegistry::builder()
            .fields(
                ["a", "b", "c", "d"]
                    .into_iter()
                    .map(|k| FieldDefinition::new(k, k.to_uppercase(), FieldType::Text)),
            )
            .build()
            .unwrap();
        let def = TemplateDef {
            type_key: "t".into(),
            name: "T".into(),
            category: DocumentCategory::Other,
            description: None,
            icon: None,
            fields: fields
                .iter()
                .map(|(key, section, order)| TemplateFieldDef {
                    field_key: key.to_string(),
                    is_required: None,
                    section: section.to_string(),
                    display_order: *order,
                    conditional_logic: None,
                })
                .collect(),
        };
        DocumentTypeTemplate::resolve(def, &registry).unwrap()
    }

    fn keys<'a>(section: &Section<'a>) -> Vec<&'a str> {
        section.fields.iter().map(|f| f.field_key()).collect()
    }

    #[test]
    fn sorts_within_section_by_display_order() {
        let t = template(&[("a", "s", 2), ("b", "s", 1)]);
        let sections = t.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "s");
        assert_eq!(keys(&sections[0]), vec!["b", "a"]);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let t = template(&[("c", "s", 1), ("a", "s", 1), ("b", "s", 0), ("d", "s", 1)]);
        assert_eq!(keys(&t.sections()[0]), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn sections_follow_first_appearance() {
        let t = template(&[("a", "second", 1), ("b", "first", 1), ("c", "second", 0)]);
        let sections = t.sections();
        let names: Vec<_> = sections.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(keys(&sections[0]), vec!["c", "a"]);
    }

    #[test]
    fn compose_drops_hidden_fields_and_empty_sections() {
        let registry = FieldRegistry::builder()
            .field(FieldDefinition::new("kind", "Kind", FieldType::Text))
            .field(FieldDefinition::new("extra", "Extra", FieldType::Text))
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
                    is_required: None,
                    section: "main".into(),
                    display_order: 1,
                    conditional_logic: None,
                },
                TemplateFieldDef {
                    field_key: "extra".into(),
                    is_required: None,
                    section: "more".into(),
                    display_order: 1,
                    conditional_logic: Some(
                        ConditionalLogic::new("kind", Operator::Equals, "full").into(),
                    ),
                },
            ],
        };
        let t = DocumentTypeTemplate::resolve(def, &registry).unwrap();

        let mut values = FieldValues::new();
        values.insert("kind".into(), "basic".into());
        values.insert("extra".into(), "stale".into());
        let sections = compose_sections(&t, &values);
        assert_eq!(sections.len(), 1);
        assert_eq!(keys(&sections[0]), vec!["kind"]);

        values.insert("kind".into(), "full".into());
        assert_eq!(compose_sections(&t, &values).len(), 2);
    }
}
