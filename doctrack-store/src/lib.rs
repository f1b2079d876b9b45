//! Typed attribute-value storage for document fields
//!
//! Field values are stored one row per `(document, field)` with an explicit
//! [`ValueType`] tag, so arbitrary document types persist without schema
//! changes and every value reads back as the type it was written with.
//!
//! - [`FieldValueDatabase`]: the synchronous SQLite layer
//! - [`FieldValueStore`] / [`SqliteValueStore`]: async access for callers on a tokio runtime
//! - [`save_form`] / [`load_form`]: validate, then persist; load, then rebuild the form

pub mod codec;
pub mod db;
pub mod error;
pub mod save;
pub mod store;

pub use codec::{decode, decode_lossy, encode, infer_value_type, EncodedValue, ValueType};
pub use db::{FieldValueDatabase, FieldValueRow, DEFAULT_DB_FILENAME};
pub use error::{Result, SaveError, StoreError};
pub use save::{load_form, save_form};
pub use store::{FieldValueStore, SqliteValueStore};
