use std::sync::Arc;

use tracing::{debug, warn};

use crate::{BookingItem, CartError};
use crate::services::merger::merge;
use crate::services::store::{InMemoryStore, KeyValueStore};

/// Subject-scoped, ordered persistence of cart items.
///
/// Storage is best-effort: reads that fail or find corrupt data yield an empty cart
/// and writes that fail are logged. Nothing here ever returns an error to the caller.
#[derive(Clone)]
pub struct ItemRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ItemRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn storage_key(subject_id: &str) -> String {
        format!("cart_{}", subject_id)
    }

    pub async fn load(&self, subject_id: &str) -> Vec<BookingItem> {
        match self.try_load(subject_id).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Treating cart for subject {} as empty: {}", subject_id, e);
                Vec::new()
            }
        }
    }

    pub async fn save(&self, subject_id: &str, items: &[BookingItem]) {
        if let Err(e) = self.try_save(subject_id, items).await {
            warn!("Failed to persist cart for subject {}: {}", subject_id, e);
        }
    }

    pub async fn remove(&self, subject_id: &str, id: &str) {
        let mut items = self.load(subject_id).await;
        let before = items.len();
        items.retain(|item| item.id != id);

        if items.len() != before {
            self.save(subject_id, &items).await;
        }
    }

    pub async fn clear(&self, subject_id: &str) {
        if let Err(e) = self.store.delete(&Self::storage_key(subject_id)).await {
            warn!("Failed to clear persisted cart for subject {}: {}", subject_id, e);
        }
    }

    async fn try_load(&self, subject_id: &str) -> Result<Vec<BookingItem>, CartError> {
        let key = Self::storage_key(subject_id);
        let Some(raw) = self.store.get(&key).await? else {
            debug!("No persisted cart under {}", key);
            return Ok(Vec::new());
        };

        let items: Vec<BookingItem> = serde_json::from_str(&raw)
            .map_err(|e| CartError::StorageFault(format!("corrupt cart under {}: {}", key, e)))?;

        // Persisted data predates any uniqueness guarantee, so collapse repeated ids.
        Ok(merge(&[], &items))
    }

    async fn try_save(&self, subject_id: &str, items: &[BookingItem]) -> Result<(), CartError> {
        let key = Self::storage_key(subject_id);
        let raw = serde_json::to_string(items)?;
        self.store.set(&key, &raw).await?;
        debug!("Persisted {} cart items under {}", items.len(), key);
        Ok(())
    }
}
