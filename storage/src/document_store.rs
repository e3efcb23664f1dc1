// storage/src/document_store.rs

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, StorageError};

/// Collection names shared with the other clients of the platform's store.
pub mod collections {
    pub const DOCTORS: &str = "doctors";
    pub const HOSPITALS: &str = "hospitals";
    pub const APPOINTMENTS: &str = "appointments";
    pub const PATIENTS: &str = "patients";
    pub const USERS: &str = "users";
    pub const PRESCRIPTIONS: &str = "prescriptions";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// A document returned by the store: backend-assigned id plus a JSON object
/// of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

impl Document {
    /// Decodes the field payload into a typed model. Unknown fields are
    /// ignored so documents written by other clients still decode.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.fields.clone())?)
    }
}

/// Equality-filtered access to an external document database.
///
/// The contract mirrors what the hosted backend offers: single-field
/// equality queries, id lookups, and independent per-document writes. No
/// transactions; every call is a separate round trip.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// All documents in `collection` whose `field` equals `value`.
    async fn find(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Creates a document and returns the backend-assigned id. `fields`
    /// must be a JSON object.
    async fn create(&self, collection: &str, fields: Value) -> Result<String>;

    /// Shallow-merges `partial` (a JSON object) into an existing document.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

pub(crate) fn require_object(fields: &Value) -> Result<()> {
    if fields.is_object() {
        Ok(())
    } else {
        Err(StorageError::PreconditionFailed(
            "document payload must be a JSON object".to_string(),
        ))
    }
}
