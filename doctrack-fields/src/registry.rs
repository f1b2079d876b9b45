//! The field definition registry.
//!
//! Built once through [`FieldRegistryBuilder`], then read-only. Definitions
//! are handed out as `Arc`s so every template that references a key shares
//! the exact same label and rules.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{FieldsError, Result};
use crate::types::{CustomRule, CustomVerdict, FieldDefinition};
use crate::value::FieldValue;

/// Immutable catalog of field definitions keyed by `field_key`.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Arc<FieldDefinition>>,
    index: HashMap<String, usize>,
}

impl FieldRegistry {
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder::new()
    }

    /// Get a field definition by key.
    pub fn get(&self, field_key: &str) -> Option<&Arc<FieldDefinition>> {
        self.index.get(field_key).map(|&i| &self.fields[i])
    }

    /// Get a field definition by key, or fail with `FieldNotFound`.
    pub fn require(&self, field_key: &str) -> Result<&Arc<FieldDefinition>> {
        self.get(field_key).ok_or_else(|| FieldsError::FieldNotFound {
            key: field_key.to_string(),
        })
    }

    /// All field definitions in registration order.
    pub fn list(&self) -> &[Arc<FieldDefinition>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Collects definitions and custom predicates, then validates them all at once.
#[derive(Default)]
pub struct FieldRegistryBuilder {
    fields: Vec<FieldDefinition>,
    custom: Vec<(String, CustomRule)>,
}

impl FieldRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field definition.
    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    /// Add several field definitions.
    pub fn fields(mut self, defs: impl IntoIterator<Item = FieldDefinition>) -> Self {
        self.fields.extend(defs);
        self
    }

    /// Attach a custom predicate to the field with `field_key`.
    pub fn custom_rule<F>(self, field_key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldValue) -> CustomVerdict + Send + Sync + 'static,
    {
        self.rule(field_key, CustomRule::new(f))
    }

    /// Attach an already boxed custom predicate.
    pub fn rule(mut self, field_key: impl Into<String>, rule: CustomRule) -> Self {
        self.custom.push((field_key.into(), rule));
        self
    }

    /// Check keys and rule invariants, then freeze the registry.
    pub fn build(self) -> Result<FieldRegistry> {
        let mut registry = FieldRegistry::default();
        let mut fields = self.fields;

        for (key, rule) in self.custom {
            let def = fields
                .iter_mut()
                .find(|f| f.field_key == key)
                .ok_or(FieldsError::FieldNotFound { key })?;
            def.validation_rules.custom = Some(rule);
        }

        for def in fields {
            if registry.index.contains_key(&def.field_key) {
                return Err(FieldsError::DuplicateFieldKey { key: def.field_key });
            }
            def.check_rules()
                .map_err(|message| FieldsError::InvalidRules {
                    field_key: def.field_key.clone(),
                    message,
                })?;
            registry
                .index
                .insert(def.field_key.clone(), registry.fields.len());
            registry.fields.push(Arc::new(def));
        }

        debug!(fields = registry.fields.len(), "field registry built");
        Ok(registry)
    }
}
