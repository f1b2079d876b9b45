//! Error types for the field and template registries
//!
//! Every variant here is a configuration defect. They are raised while the
//! registries are being built and never while validating or resolving
//! visibility for user data.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur while building the field or template registries
#[derive(Debug, Error)]
pub enum FieldsError {
    /// Field not found by key
    #[error("field not found: {key}")]
    FieldNotFound { key: String },

    /// Two field definitions share a key
    #[error("duplicate field key: {key}")]
    DuplicateFieldKey { key: String },

    /// Two templates share a type key
    #[error("duplicate document type: {type_key}")]
    DuplicateTemplate { type_key: String },

    /// A template references a field key the registry does not know
    #[error("document type '{type_key}' references unknown field '{field_key}'")]
    DanglingFieldReference { type_key: String, field_key: String },

    /// A conditional rule is controlled by a field that is not part of the template
    #[error("field '{field_key}' in document type '{type_key}' depends on '{controller}', which is not in the template")]
    DanglingController {
        type_key: String,
        field_key: String,
        controller: String,
    },

    /// The same field key appears twice in one section of a template
    #[error("document type '{type_key}' lists field '{field_key}' twice in section '{section}'")]
    DuplicateTemplateField {
        type_key: String,
        section: String,
        field_key: String,
    },

    /// Validation rules are inconsistent with each other or with the field type
    #[error("invalid validation rules on field '{field_key}': {message}")]
    InvalidRules { field_key: String, message: String },

    /// Schema directory could not be read
    #[error("schema directory not found: {path}")]
    NotInitialized { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
