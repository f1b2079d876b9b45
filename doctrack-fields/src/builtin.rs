//! The built-in document type catalog.
//!
//! The shared field catalog and every stock document type are declared in
//! YAML and compiled into the binary, so a fresh install needs no files on
//! disk. A defect in either file is a programming error and fails the first
//! build.

use serde::de::DeserializeOwned;

use crate::context::FieldsContext;
use crate::error::Result;
use crate::template::TemplateDef;
use crate::types::FieldDefinition;

const FIELDS_YAML: &str = include_str!("builtin/fields.yaml");
const TEMPLATES_YAML: &str = include_str!("builtin/templates.yaml");

/// Parsed, not yet resolved, built-in declarations.
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    pub fields: Vec<FieldDefinition>,
    pub templates: Vec<TemplateDef>,
}

impl BuiltinCatalog {
    /// Parse the embedded YAML.
    pub fn parse() -> Result<Self> {
        Ok(Self {
            fields: parse_list(FIELDS_YAML)?,
            templates: parse_list(TEMPLATES_YAML)?,
        })
    }

    /// Parse and resolve the catalog into ready-to-use registries.
    pub fn load() -> Result<FieldsContext> {
        let catalog = Self::parse()?;
        FieldsContext::from_definitions(catalog.fields, catalog.templates)
    }
}

fn parse_list<T: DeserializeOwned>(yaml: &str) -> Result<Vec<T>> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}
