//! Command handlers behind the `doctrack` subcommands.
//!
//! Every handler returns the process exit code; `Err` is reserved for
//! failures that are not the user's data being invalid.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use doctrack_fields::{
    DocumentCategory, DocumentForm, DocumentTypeTemplate, FieldValue, FieldValues, FieldsContext,
    ValidationError,
};
use doctrack_store::{save_form, FieldValueStore, SaveError, SqliteValueStore};
use tracing::{debug, warn};

use crate::cli::Commands;
use crate::config::DoctrackConfig;

/// Exit code when the supplied values do not pass validation.
pub const VALIDATION_FAILED_EXIT_CODE: i32 = 1;

/// Run one subcommand against the configured schema and database.
pub async fn run(command: Commands, config: &DoctrackConfig) -> Result<i32> {
    let ctx = open_fields(config).await?;
    match command {
        Commands::Types { category, json } => {
            print_types(&ctx, category, json)?;
            Ok(0)
        }
        Commands::Show { type_key } => {
            let template = find_template(&ctx, &type_key)?;
            println!("{} ({}, {})", template.name, template.type_key, template.category);
            if let Some(description) = &template.description {
                println!("{description}");
            }
            println!("{}", type_table(template));
            Ok(0)
        }
        Commands::Form { type_key, values } => {
            let template = Arc::clone(find_template(&ctx, &type_key)?);
            let values = match values {
                Some(path) => read_values(&path).await?,
                None => FieldValues::new(),
            };
            let form = build_form(template, values);
            print_form(&form);
            Ok(0)
        }
        Commands::Validate { type_key, values } => {
            let template = Arc::clone(find_template(&ctx, &type_key)?);
            let form = build_form(template, read_values(&values).await?);
            let errors = form.errors();
            if errors.is_empty() {
                println!("{type_key}: valid");
                return Ok(0);
            }
            println!("{}", errors_table(&errors));
            println!("{} field(s) failed validation", errors.len());
            Ok(VALIDATION_FAILED_EXIT_CODE)
        }
        Commands::Save {
            document_id,
            type_key,
            values,
        } => {
            let template = Arc::clone(find_template(&ctx, &type_key)?);
            let form = build_form(template, read_values(&values).await?);
            let store = open_store(config, &ctx).await?;
            match save_form(&store, &document_id, &form).await {
                Ok(count) => {
                    println!("Saved {count} field value(s) for {document_id}");
                    Ok(0)
                }
                Err(SaveError::Validation(errors)) => {
                    println!("{}", errors_table(&errors));
                    println!("{} field(s) failed validation; nothing saved", errors.len());
                    Ok(VALIDATION_FAILED_EXIT_CODE)
                }
                Err(e) => Err(e).context("failed to save field values"),
            }
        }
        Commands::Load { document_id, json } => {
            let store = open_store(config, &ctx).await?;
            if json {
                let values = store.get_fields(&document_id).await?;
                println!("{}", values_json(&values)?);
                return Ok(0);
            }
            let rows = store.list_rows(&document_id).await?;
            if rows.is_empty() {
                println!("No field values stored for {document_id}");
                return Ok(0);
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Field", "Type", "Value", "Updated"]);
            for row in &rows {
                table.add_row(vec![&row.field_key, &row.value_type, &row.value, &row.updated_at]);
            }
            println!("{table}");
            Ok(0)
        }
        Commands::Delete { document_id } => {
            let store = open_store(config, &ctx).await?;
            let removed = store.delete_document(&document_id).await?;
            println!("Deleted {removed} field value(s) for {document_id}");
            Ok(0)
        }
    }
}

/// Built-in types, plus the custom schema directory when one is configured.
pub async fn open_fields(config: &DoctrackConfig) -> Result<FieldsContext> {
    match &config.schema_dir {
        Some(dir) => FieldsContext::open(dir)
            .with_builtins()
            .build()
            .await
            .with_context(|| format!("failed to load schema from {}", dir.display())),
        None => FieldsContext::builtin().context("failed to load built-in document types"),
    }
}

async fn open_store(config: &DoctrackConfig, ctx: &FieldsContext) -> Result<SqliteValueStore> {
    let path = &config.database_path;
    debug!(path = %path.display(), "opening field value database");
    SqliteValueStore::open(path.clone(), Some(Arc::clone(ctx.fields())))
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

fn find_template<'a>(ctx: &'a FieldsContext, type_key: &str) -> Result<&'a Arc<DocumentTypeTemplate>> {
    ctx.template(type_key)
        .ok_or_else(|| anyhow!("unknown document type: {type_key}"))
}

/// Read a value map from a JSON or YAML file. Anything that is not
/// `.yaml`/`.yml` is parsed as JSON.
pub async fn read_values(path: &Path) -> Result<FieldValues> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let values = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml_ng::from_str(&content)
            .with_context(|| format!("invalid YAML value map in {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON value map in {}", path.display()))?,
    };
    Ok(values)
}

/// Bind `values` to the template, dropping keys the template does not use.
pub fn build_form(template: Arc<DocumentTypeTemplate>, values: FieldValues) -> DocumentForm {
    let mut form = DocumentForm::new(Arc::clone(&template));
    for (key, value) in values {
        if template.field(&key).is_none() {
            warn!(field = %key, type_key = %template.type_key, "ignoring value for unknown field");
            continue;
        }
        form.set_value(key, value);
    }
    form
}

fn print_types(ctx: &FieldsContext, category: Option<DocumentCategory>, json: bool) -> Result<()> {
    let templates: Vec<&Arc<DocumentTypeTemplate>> = match category {
        Some(category) => ctx.templates().list_by_category(category),
        None => ctx.templates().list_all().iter().collect(),
    };

    if json {
        let list: Vec<_> = templates
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type_key": t.type_key,
                    "name": t.name,
                    "category": t.category,
                    "fields": t.fields().len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    if templates.is_empty() {
        println!("No document types found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Type", "Name", "Category", "Fields"]);
    for t in &templates {
        table.add_row(vec![
            t.type_key.clone(),
            t.name.clone(),
            t.category.to_string(),
            t.fields().len().to_string(),
        ]);
    }
    println!("{table}");
    println!();
    println!("{} document type(s)", templates.len());
    Ok(())
}

/// Every field of a template in section order, hidden or not.
pub fn type_table(template: &DocumentTypeTemplate) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Section",
        "Field",
        "Label",
        "Kind",
        "Required",
        "Options",
        "Shown when",
    ]);
    for section in template.sections() {
        for field in section.fields {
            let condition = field
                .conditional_logic
                .as_ref()
                .map(|c| serde_json::to_string(c).unwrap_or_default())
                .unwrap_or_default();
            let options = field
                .field
                .default_options()
                .iter()
                .map(|o| o.display_label())
                .collect::<Vec<_>>()
                .join(", ");
            table.add_row(vec![
                section.name.to_string(),
                field.field_key().to_string(),
                field.label().to_string(),
                field.field.field_type.kind_name().to_string(),
                if field.is_required { "yes" } else { "" }.to_string(),
                options,
                condition,
            ]);
        }
    }
    table
}

fn print_form(form: &DocumentForm) {
    let errors = form.validate();
    for section in form.sections() {
        println!("## {}", section.name);
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Field", "Key", "Kind", "Value", "Error"]);
        for field in &section.fields {
            let label = if field.is_required {
                format!("{} *", field.label())
            } else {
                field.label().to_string()
            };
            let value = form
                .value(field.field_key())
                .map(display_value)
                .unwrap_or_default();
            let error = errors.get(field.field_key()).cloned().unwrap_or_default();
            table.add_row(vec![
                label,
                field.field_key().to_string(),
                field.field.field_type.kind_name().to_string(),
                value,
                error,
            ]);
        }
        println!("{table}");
        println!();
    }
}

pub fn errors_table(errors: &[ValidationError]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Message"]);
    for e in errors {
        table.add_row(vec![&e.field_key, &e.message]);
    }
    table
}

fn display_value(value: &FieldValue) -> String {
    value.coerce_string()
}

/// Pretty JSON with keys in a stable order.
fn values_json(values: &FieldValues) -> Result<String> {
    let ordered: BTreeMap<&String, &FieldValue> = values.iter().collect();
    Ok(serde_json::to_string_pretty(&ordered)?)
}
