//! SQLite storage for document field values
//!
//! Each field value is one row keyed by `(document_id, field_definition_id)`,
//! so new document types never need a schema change. Field definition rows
//! are created lazily the first time a key is written.
//!
//! # Schema
//!
//! - `field_definitions`: one row per `field_key` (id, field_key, field_type, label)
//! - `document_field_values`: (document_id, field_definition_id, value, value_type, timestamps)
//!
//! A document's values are always replaced as a whole inside one transaction,
//! so readers never observe a half-written set.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use doctrack_fields::{FieldRegistry, FieldValue, FieldValues};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::debug;
use ulid::Ulid;

use crate::codec::{decode_lossy, encode, EncodedValue};
use crate::error::{Result, StoreError};

/// Default database filename
pub const DEFAULT_DB_FILENAME: &str = "doctrack.db";

/// SQLite cache size in KB (negative value means KB, positive means pages)
const SQLITE_CACHE_SIZE_KB: &str = "-16000";

/// A persisted field value exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValueRow {
    pub document_id: String,
    pub field_definition_id: String,
    pub field_key: String,
    pub value: String,
    pub value_type: String,
    pub created_at: String,
    pub updated_at: String,
}

/// SQLite database holding every document's field values.
///
/// `Send + Sync` through the connection mutex, so one instance can be shared
/// behind an `Arc` by async callers.
pub struct FieldValueDatabase {
    conn: Mutex<Connection>,
    registry: Option<Arc<FieldRegistry>>,
}

impl FieldValueDatabase {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", SQLITE_CACHE_SIZE_KB)?;
        Self::with_connection(conn)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Mutex::new(conn),
            registry: None,
        };
        db.create_schema()?;
        Ok(db)
    }

    /// Use `registry` for type hints and for the metadata of lazily created
    /// field definition rows.
    pub fn with_registry(mut self, registry: Arc<FieldRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn create_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS field_definitions (
                id TEXT PRIMARY KEY,
                field_key TEXT NOT NULL UNIQUE,
                field_type TEXT NOT NULL,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS document_field_values (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                field_definition_id TEXT NOT NULL REFERENCES field_definitions(id),
                value TEXT NOT NULL,
                value_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (document_id, field_definition_id)
            );

            CREATE INDEX IF NOT EXISTS idx_field_values_document
                ON document_field_values(document_id);
            "#,
        )?;
        Ok(())
    }

    fn encode(&self, field_key: &str, value: &FieldValue) -> Option<EncodedValue> {
        let hint = self
            .registry
            .as_ref()
            .and_then(|r| r.get(field_key))
            .map(|def| &def.field_type);
        encode(value, hint)
    }

    /// Find the definition row for `field_key`, creating it if needed.
    fn ensure_definition(&self, tx: &Transaction<'_>, field_key: &str) -> Result<String> {
        let existing = tx
            .prepare_cached("SELECT id FROM field_definitions WHERE field_key = ?")?
            .query_row([field_key], |row| row.get::<_, String>(0))
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let (field_type, label) = self
            .registry
            .as_ref()
            .and_then(|r| r.get(field_key))
            .map(|def| (def.field_type.kind_name(), def.label.clone()))
            .unwrap_or(("text", field_key.to_string()));
        let id = Ulid::new().to_string();
        tx.execute(
            "INSERT INTO field_definitions (id, field_key, field_type, label, created_at) VALUES (?, ?, ?, ?, ?)",
            params![id, field_key, field_type, label, now()],
        )?;
        debug!(field = %field_key, %id, "created field definition record");
        Ok(id)
    }

    /// Replace every stored value of `document_id` with the non-empty entries
    /// of `values`. Returns the number of rows written.
    pub fn save_fields(&self, document_id: &str, values: &FieldValues) -> Result<usize> {
        let mut entries: Vec<_> = values
            .iter()
            .filter_map(|(key, value)| self.encode(key, value).map(|e| (key.as_str(), e)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let created: HashMap<String, String> = tx
            .prepare_cached(
                "SELECT field_definition_id, created_at FROM document_field_values WHERE document_id = ?",
            )?
            .query_map([document_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        tx.execute(
            "DELETE FROM document_field_values WHERE document_id = ?",
            [document_id],
        )?;

        let now = now();
        for (key, encoded) in &entries {
            let definition_id = self.ensure_definition(&tx, key)?;
            let created_at = created.get(&definition_id).unwrap_or(&now);
            tx.prepare_cached(
                "INSERT INTO document_field_values \
                 (id, document_id, field_definition_id, value, value_type, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?
            .execute(params![
                Ulid::new().to_string(),
                document_id,
                definition_id,
                encoded.value,
                encoded.value_type.as_str(),
                created_at,
                now,
            ])?;
        }
        tx.commit()?;

        debug!(%document_id, rows = entries.len(), "saved field values");
        Ok(entries.len())
    }

    /// Every stored value of `document_id`, decoded.
    pub fn get_fields(&self, document_id: &str) -> Result<FieldValues> {
        let values: FieldValues = self
            .list_rows(document_id)?
            .into_iter()
            .map(|row| {
                let value = decode_lossy(&row.field_key, &row.value_type, &row.value);
                (row.field_key, value)
            })
            .collect();
        debug!(%document_id, fields = values.len(), "loaded field values");
        Ok(values)
    }

    /// One stored value, decoded.
    pub fn get_field_value(&self, document_id: &str, field_key: &str) -> Result<Option<FieldValue>> {
        let conn = self.conn()?;
        let row = conn
            .prepare_cached(
                r#"
                SELECT v.value, v.value_type
                FROM document_field_values v
                JOIN field_definitions d ON v.field_definition_id = d.id
                WHERE v.document_id = ? AND d.field_key = ?
                "#,
            )?
            .query_row([document_id, field_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .optional()?;
        Ok(row.map(|(value, value_type)| decode_lossy(field_key, &value_type, &value)))
    }

    /// Upsert a single value. An empty value removes the stored row.
    pub fn update_field_value(&self, document_id: &str, field_key: &str, value: &FieldValue) -> Result<()> {
        let encoded = self.encode(field_key, value);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let definition_id = self.ensure_definition(&tx, field_key)?;

        match encoded {
            Some(encoded) => {
                let now = now();
                tx.execute(
                    r#"
                    INSERT INTO document_field_values
                        (id, document_id, field_definition_id, value, value_type, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                    ON CONFLICT (document_id, field_definition_id)
                    DO UPDATE SET value = excluded.value,
                                  value_type = excluded.value_type,
                                  updated_at = excluded.updated_at
                    "#,
                    params![
                        Ulid::new().to_string(),
                        document_id,
                        definition_id,
                        encoded.value,
                        encoded.value_type.as_str(),
                        now,
                    ],
                )?;
            }
            None => {
                tx.execute(
                    "DELETE FROM document_field_values WHERE document_id = ? AND field_definition_id = ?",
                    params![document_id, definition_id],
                )?;
            }
        }
        tx.commit()?;
        debug!(%document_id, field = %field_key, "updated field value");
        Ok(())
    }

    /// Remove every stored value of `document_id`. Returns the number of rows removed.
    pub fn delete_document(&self, document_id: &str) -> Result<usize> {
        let deleted = self.conn()?.execute(
            "DELETE FROM document_field_values WHERE document_id = ?",
            [document_id],
        )?;
        debug!(%document_id, rows = deleted, "deleted document field values");
        Ok(deleted)
    }

    /// The raw rows of `document_id`, ordered by field key.
    pub fn list_rows(&self, document_id: &str) -> Result<Vec<FieldValueRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT v.document_id, v.field_definition_id, d.field_key, v.value, v.value_type,
                   v.created_at, v.updated_at
            FROM document_field_values v
            JOIN field_definitions d ON v.field_definition_id = d.id
            WHERE v.document_id = ?
            ORDER BY d.field_key
            "#,
        )?;
        let rows = stmt.query_map([document_id], |row| {
            Ok(FieldValueRow {
                document_id: row.get(0)?,
                field_definition_id: row.get(1)?,
                field_key: row.get(2)?,
                value: row.get(3)?,
                value_type: row.get(4)?,
                created_at: row.get(5)?,
                updated_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Number of field definition records created so far.
    pub fn definition_count(&self) -> Result<usize> {
        Ok(self
            .conn()?
            .query_row("SELECT COUNT(*) FROM field_definitions", [], |row| row.get(0))?)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
