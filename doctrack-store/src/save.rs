//! The validate-then-persist flow behind a form's save and load.

use std::sync::Arc;

use doctrack_fields::{DocumentForm, DocumentTypeTemplate};
use tracing::debug;

use crate::error::{Result, SaveError};
use crate::store::FieldValueStore;

/// Validate the visible fields of `form` and, if they pass, replace the
/// document's stored values with the form's full value map.
///
/// Values of currently hidden fields are kept; they were entered by the user
/// and come back if the controlling value changes again.
pub async fn save_form<S>(store: &S, document_id: &str, form: &DocumentForm) -> std::result::Result<usize, SaveError>
where
    S: FieldValueStore + ?Sized,
{
    let errors = form.errors();
    if !errors.is_empty() {
        debug!(%document_id, errors = errors.len(), "save rejected by validation");
        return Err(SaveError::Validation(errors));
    }
    Ok(store.save_fields(document_id, form.values()).await?)
}

/// Rebuild a form for `template` from the document's stored values.
pub async fn load_form<S>(store: &S, document_id: &str, template: Arc<DocumentTypeTemplate>) -> Result<DocumentForm>
where
    S: FieldValueStore + ?Sized,
{
    let values = store.get_fields(document_id).await?;
    Ok(DocumentForm::with_values(template, values))
}
