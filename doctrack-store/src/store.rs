//! Async access to the attribute-value store.
//!
//! SQLite calls block, so every operation runs on tokio's blocking pool. This
//! is the only place in doctrack that performs I/O on behalf of a document.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use doctrack_fields::{FieldRegistry, FieldValue, FieldValues};

use crate::db::{FieldValueDatabase, FieldValueRow};
use crate::error::Result;

/// Persistence for one document's typed field values.
#[async_trait]
pub trait FieldValueStore: Send + Sync {
    /// Replace the document's full value set. Returns the number of rows written.
    async fn save_fields(&self, document_id: &str, values: &FieldValues) -> Result<usize>;

    /// All stored values of the document.
    async fn get_fields(&self, document_id: &str) -> Result<FieldValues>;

    /// One stored value, if present.
    async fn get_field_value(&self, document_id: &str, field_key: &str) -> Result<Option<FieldValue>>;

    /// Insert or update a single value; an empty value removes it.
    async fn update_field_value(&self, document_id: &str, field_key: &str, value: &FieldValue) -> Result<()>;

    /// Remove every value of the document. Returns the number of rows removed.
    async fn delete_document(&self, document_id: &str) -> Result<usize>;

    /// Raw persisted rows, ordered by field key.
    async fn list_rows(&self, document_id: &str) -> Result<Vec<FieldValueRow>>;
}

/// [`FieldValueStore`] backed by a SQLite file.
#[derive(Clone)]
pub struct SqliteValueStore {
    db: Arc<FieldValueDatabase>,
}

impl SqliteValueStore {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl Into<PathBuf>, registry: Option<Arc<FieldRegistry>>) -> Result<Self> {
        let path = path.into();
        let db = tokio::task::spawn_blocking(move || FieldValueDatabase::open(path)).await??;
        Ok(Self::from_database(db, registry))
    }

    /// A private in-memory store, mostly for tests.
    pub fn open_in_memory(registry: Option<Arc<FieldRegistry>>) -> Result<Self> {
        Ok(Self::from_database(FieldValueDatabase::open_in_memory()?, registry))
    }

    fn from_database(db: FieldValueDatabase, registry: Option<Arc<FieldRegistry>>) -> Self {
        let db = match registry {
            Some(registry) => db.with_registry(registry),
            None => db,
        };
        Self { db: Arc::new(db) }
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&FieldValueDatabase) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || f(db.as_ref())).await?
    }
}

#[async_trait]
impl FieldValueStore for SqliteValueStore {
    async fn save_fields(&self, document_id: &str, values: &FieldValues) -> Result<usize> {
        let document_id = document_id.to_string();
        let values = values.clone();
        self.run(move |db| db.save_fields(&document_id, &values)).await
    }

    async fn get_fields(&self, document_id: &str) -> Result<FieldValues> {
        let document_id = document_id.to_string();
        self.run(move |db| db.get_fields(&document_id)).await
    }

    async fn get_field_value(&self, document_id: &str, field_key: &str) -> Result<Option<FieldValue>> {
        let document_id = document_id.to_string();
        let field_key = field_key.to_string();
        self.run(move |db| db.get_field_value(&document_id, &field_key))
            .await
    }

    async fn update_field_value(&self, document_id: &str, field_key: &str, value: &FieldValue) -> Result<()> {
        let document_id = document_id.to_string();
        let field_key = field_key.to_string();
        let value = value.clone();
        self.run(move |db| db.update_field_value(&document_id, &field_key, &value))
            .await
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let document_id = document_id.to_string();
        self.run(move |db| db.delete_document(&document_id)).await
    }

    async fn list_rows(&self, document_id: &str) -> Result<Vec<FieldValueRow>> {
        let document_id = document_id.to_string();
        self.run(move |db| db.list_rows(&document_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.db");

        let mut values = FieldValues::new();
        values.insert("full_name".into(), "Ada Lovelace".into());
        values.insert("year".into(), FieldValue::Number(1843.0));

        {
            let store = SqliteValueStore::open(&path, None).await.unwrap();
            assert_eq!(store.save_fields("doc-1", &values).await.unwrap(), 2);
        }

        let store = SqliteValueStore::open(&path, None).await.unwrap();
        assert_eq!(store.get_fields("doc-1").await.unwrap(), values);
    }

    #[tokio::test]
    async fn trait_object_dispatch() {
        let store: Arc<dyn FieldValueStore> = Arc::new(SqliteValueStore::open_in_memory(None).unwrap());
        store
            .update_field_value("doc-1", "organ_donor", &true.into())
            .await
            .unwrap();
        assert_eq!(
            store.get_field_value("doc-1", "organ_donor").await.unwrap(),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(store.list_rows("doc-1").await.unwrap().len(), 1);
        assert_eq!(store.delete_document("doc-1").await.unwrap(), 1);
        assert!(store.get_fields("doc-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_documents() {
        let store = SqliteValueStore::open_in_memory(None).unwrap();
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut values = FieldValues::new();
                values.insert("policy_number".into(), format!("POL-{i}").into());
                store.save_fields(&format!("doc-{i}"), &values).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1);
        }
        for i in 0..8 {
            assert_eq!(
                store.get_field_value(&format!("doc-{i}"), "policy_number").await.unwrap(),
                Some(FieldValue::Text(format!("POL-{i}")))
            );
        }
    }
}
