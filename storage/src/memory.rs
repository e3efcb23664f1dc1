// storage/src/memory.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::document_store::{require_object, Document, DocumentStore};
use crate::errors::{Result, StorageError};

/// In-memory document store for tests and local runs.
///
/// Documents per collection are kept in a BTreeMap so reads come back in a
/// deterministic order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, BTreeMap<String, Value>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Inserts a document under a caller-chosen id. Test seeding helper.
    pub async fn seed(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        require_object(&fields)?;
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    pub async fn len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, |docs| docs.len())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, fields)| fields.get(field) == Some(value))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.get(id).map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            })
        }))
    }

    async fn create(&self, collection: &str, fields: Value) -> Result<String> {
        require_object(&fields)?;
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<()> {
        require_object(&partial)?;
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StorageError::NotFound(format!("{collection}/{id}")))?;
        if let (Value::Object(existing), Value::Object(incoming)) = (doc, partial) {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        // Deleting an absent document succeeds, matching the backend.
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}
