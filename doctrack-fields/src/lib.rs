//! Field registry and document type template system
//!
//! `doctrack-fields` is a schema-only crate: it knows which fields a document
//! type has, which of them are visible for a given set of values, and whether
//! those values are acceptable. It never touches storage; the attribute store
//! lives in `doctrack-store`.
//!
//! # Architecture
//!
//! - **Shared definitions**: a field is declared once in the [`FieldRegistry`]
//!   and referenced by key from any number of templates
//! - **Fail fast**: dangling keys, duplicates and inconsistent rules are
//!   rejected when the registries are built, never at validation time
//! - **Pure resolution**: visibility, validation and section layout are plain
//!   functions of a template and a value map
//! - **Built-in catalog**: stock document types are embedded YAML; a schema
//!   directory adds more through [`FieldsContext::open`]

pub mod builtin;
pub mod context;
pub mod error;
pub mod form;
pub mod registry;
pub mod sections;
pub mod template;
pub mod types;
pub mod validation;
pub mod value;
pub mod visibility;

pub use builtin::BuiltinCatalog;
pub use context::{FieldsContext, FieldsContextBuilder};
pub use error::{FieldsError, Result};
pub use form::{DocumentForm, ExtractedFields, ExtractedValue};
pub use registry::{FieldRegistry, FieldRegistryBuilder};
pub use sections::{assemble_sections, compose_sections, Section};
pub use template::{
    DocumentCategory, DocumentTypeField, DocumentTypeTemplate, TemplateDef, TemplateFieldDef,
    TemplateRegistry,
};
pub use types::{
    CustomRule, CustomVerdict, Editor, FieldDefinition, FieldType, Pattern, SelectOption,
    ValidationRules, ValueFormat,
};
pub use validation::{validate_all_fields, validate_field, validate_value, ValidationError};
pub use value::{format_number, DateValue, FieldValue, FieldValues};
pub use visibility::{is_visible, Condition, ConditionalLogic, Operator};
