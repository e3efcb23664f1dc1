// storage/src/notifications.rs

use std::sync::Arc;

use async_trait::async_trait;

use models::OtpNotification;

use crate::document_store::{collections, DocumentStore};
use crate::errors::Result;

/// Outbound notification seam. The consumer (the patient's mobile client)
/// reads asynchronously; no acknowledgment ever flows back.
#[async_trait]
pub trait NotificationChannel: Send + Sync + std::fmt::Debug {
    async fn publish(&self, notification: &OtpNotification) -> Result<String>;
}

/// Notification channel backed by the shared document store: publishing is
/// a single create into the `notifications` collection.
#[derive(Debug, Clone)]
pub struct StoreNotificationChannel {
    store: Arc<dyn DocumentStore>,
}

impl StoreNotificationChannel {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        StoreNotificationChannel { store }
    }
}

#[async_trait]
impl NotificationChannel for StoreNotificationChannel {
    async fn publish(&self, notification: &OtpNotification) -> Result<String> {
        let fields = serde_json::to_value(notification)?;
        let id = self.store.create(collections::NOTIFICATIONS, fields).await?;
        tracing::debug!(target_email = %notification.target_email, id = %id, "published access-request notification");
        Ok(id)
    }
}
