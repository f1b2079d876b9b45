//! FieldsContext: the main API surface for the field and template registries.
//!
//! Combines the built-in catalog with user-supplied YAML under a schema
//! directory and freezes both registries behind `Arc`s so they can be shared
//! across tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::{debug, warn};

use crate::builtin::BuiltinCatalog;
use crate::error::{FieldsError, Result};
use crate::form::DocumentForm;
use crate::registry::FieldRegistry;
use crate::template::{DocumentTypeTemplate, TemplateDef, TemplateRegistry};
use crate::types::{CustomRule, CustomVerdict, FieldDefinition};
use crate::value::FieldValue;

/// Builder for `FieldsContext`. Created by `FieldsContext::open()` or
/// `FieldsContext::builder()`.
#[derive(Default)]
pub struct FieldsContextBuilder {
    root: Option<PathBuf>,
    builtins: bool,
    fields: Vec<FieldDefinition>,
    templates: Vec<TemplateDef>,
    custom: Vec<(String, CustomRule)>,
}

impl FieldsContextBuilder {
    /// Include the built-in field catalog and document types.
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    /// Register an extra field definition.
    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    /// Register an extra document type.
    pub fn template(mut self, def: TemplateDef) -> Self {
        self.templates.push(def);
        self
    }

    /// Attach a custom predicate to a field, built-in or custom.
    pub fn custom_rule<F>(mut self, field_key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldValue) -> CustomVerdict + Send + Sync + 'static,
    {
        self.custom.push((field_key.into(), CustomRule::new(f)));
        self
    }

    /// Build the context: built-ins first, then programmatic additions, then
    /// whatever the schema directory holds.
    pub async fn build(self) -> Result<FieldsContext> {
        let mut fields = Vec::new();
        let mut templates = Vec::new();

        if self.builtins {
            let catalog = BuiltinCatalog::parse()?;
            fields.extend(catalog.fields);
            templates.extend(catalog.templates);
        }
        fields.extend(self.fields);
        templates.extend(self.templates);

        if let Some(root) = &self.root {
            if !fs::try_exists(root).await? {
                return Err(FieldsError::NotInitialized { path: root.clone() });
            }
            let defs_dir = root.join("definitions");
            let templates_dir = root.join("templates");
            fields.extend(load_dir::<FieldDefinition>(&defs_dir, "field definition").await?);
            templates.extend(load_dir::<TemplateDef>(&templates_dir, "document type").await?);
        }

        let ctx = assemble(self.root, fields, templates, self.custom)?;
        debug!(
            fields = ctx.fields.len(),
            templates = ctx.templates.len(),
            "fields context opened"
        );
        Ok(ctx)
    }
}

/// Read every `.yaml`/`.yml` file in `dir`, in file-name order. A missing
/// directory is empty; a file that does not parse is skipped with a warning.
async fn load_dir<T: DeserializeOwned>(dir: &Path, what: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    if !fs::try_exists(dir).await? {
        return Ok(out);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        ) {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let content = fs::read_to_string(&path).await?;
        match serde_yaml_ng::from_str::<T>(&content) {
            Ok(def) => out.push(def),
            Err(e) => warn!(?path, %e, "skipping invalid {what}"),
        }
    }
    Ok(out)
}

fn assemble(
    root: Option<PathBuf>,
    fields: Vec<FieldDefinition>,
    templates: Vec<TemplateDef>,
    custom: Vec<(String, CustomRule)>,
) -> Result<FieldsContext> {
    let registry = custom
        .into_iter()
        .fold(FieldRegistry::builder().fields(fields), |b, (key, rule)| {
            b.rule(key, rule)
        })
        .build()?;
    let templates = TemplateRegistry::build(templates, &registry)?;
    Ok(FieldsContext {
        root,
        fields: Arc::new(registry),
        templates: Arc::new(templates),
    })
}

/// Immutable, cheaply cloneable handle on both registries.
///
/// A schema directory has the structure:
/// ```text
/// schema/
///   definitions/    ← one .yaml per field definition
///   templates/      ← one .yaml per document type
/// ```
#[derive(Debug, Clone)]
pub struct FieldsContext {
    root: Option<PathBuf>,
    fields: Arc<FieldRegistry>,
    templates: Arc<TemplateRegistry>,
}

impl FieldsContext {
    /// Load a schema directory. Returns a builder for optional configuration.
    ///
    /// ```rust,ignore
    /// let ctx = FieldsContext::open(path)
    ///     .with_builtins()
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> FieldsContextBuilder {
        FieldsContextBuilder {
            root: Some(root.into()),
            ..Default::default()
        }
    }

    /// A builder with no schema directory.
    pub fn builder() -> FieldsContextBuilder {
        FieldsContextBuilder::default()
    }

    /// The built-in catalog only.
    pub fn builtin() -> Result<Self> {
        BuiltinCatalog::load()
    }

    /// Resolve explicit declarations without touching the filesystem.
    pub fn from_definitions(fields: Vec<FieldDefinition>, templates: Vec<TemplateDef>) -> Result<Self> {
        assemble(None, fields, templates, Vec::new())
    }

    pub fn fields(&self) -> &Arc<FieldRegistry> {
        &self.fields
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    /// Get a document type by key.
    pub fn template(&self, type_key: &str) -> Option<&Arc<DocumentTypeTemplate>> {
        self.templates.get_template(type_key)
    }

    /// Get a field definition by key.
    pub fn field(&self, field_key: &str) -> Option<&Arc<FieldDefinition>> {
        self.fields.get(field_key)
    }

    /// An empty form for a document type.
    pub fn form(&self, type_key: &str) -> Option<DocumentForm> {
        self.template(type_key).cloned().map(DocumentForm::new)
    }

    /// The schema directory, if one was opened.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}
