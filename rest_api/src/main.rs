// rest_api/src/main.rs

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;

use rest_api::config::load_rest_api_config;
use storage::{BlobStore, DocumentStore, InMemoryBlobStore, InMemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_rest_api_config()?;

    // Local runs use the in-memory backends; a deployment wires the hosted
    // document database and image host in through the same traits.
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
    let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::default());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    rest_api::start_server(config, store, blobs, shutdown_rx).await
}
