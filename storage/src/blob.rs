// storage/src/blob.rs

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::Result;

/// Binary upload seam for the external image host: bytes in, stable URL out.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// In-memory blob host for tests and local runs. Uploaded objects are held
/// alive for the lifetime of the store and addressed under `base_url`.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        InMemoryBlobStore {
            base_url: base_url.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        InMemoryBlobStore::new("memory://uploads")
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let url = format!("{}/{}", self.base_url, id);
        let mut objects = self.objects.write().await;
        objects.insert(id, (content_type.to_string(), bytes.to_vec()));
        Ok(url)
    }
}
