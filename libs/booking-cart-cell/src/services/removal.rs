use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::{BookingItem, CartError, ClearReport};
use crate::services::remote::SchedulingApi;
use crate::services::repository::ItemRepository;
use crate::services::selection::SelectionSet;

/// Outcome of the remote half of a removal. The local half always happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteDelete {
    /// Local draft or no server record; nothing was sent.
    Skipped,
    Deleted,
    Failed,
}

/// Removes cart items locally and makes one best-effort delete attempt per
/// server-backed item. Remote failures never block the local removal.
#[derive(Clone)]
pub struct RemovalOrchestrator {
    api: Arc<dyn SchedulingApi>,
    repository: ItemRepository,
}

impl RemovalOrchestrator {
    pub fn new(api: Arc<dyn SchedulingApi>, repository: ItemRepository) -> Self {
        Self { api, repository }
    }

    pub async fn remove(
        &self,
        subject_id: &str,
        items: &mut Vec<BookingItem>,
        selection: &mut SelectionSet,
        id: &str,
    ) -> Result<RemoteDelete, CartError> {
        let item = items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| CartError::ItemNotFound(id.to_string()))?;

        let remote = self.delete_remote(&item).await;

        items.retain(|item| item.id != id);
        selection.remove(id);
        self.repository.save(subject_id, items).await;

        info!("Removed cart item {} for subject {} (remote: {:?})", id, subject_id, remote);
        Ok(remote)
    }

    pub async fn clear_all(
        &self,
        subject_id: &str,
        items: &mut Vec<BookingItem>,
        selection: &mut SelectionSet,
    ) -> ClearReport {
        let outcomes = join_all(items.iter().map(|item| self.delete_remote(item))).await;

        let attempted = outcomes.iter().filter(|o| **o != RemoteDelete::Skipped).count();
        let failed = outcomes.iter().filter(|o| **o == RemoteDelete::Failed).count();
        let removed = items.len();

        items.clear();
        selection.select_none();
        self.repository.clear(subject_id).await;

        if failed > 0 {
            warn!(
                "Cleared cart for subject {} with {} of {} remote deletes failing",
                subject_id, failed, attempted
            );
        } else {
            info!("Cleared {} cart items for subject {}", removed, subject_id);
        }

        ClearReport { removed, attempted, failed }
    }

    pub async fn delete_remote(&self, item: &BookingItem) -> RemoteDelete {
        let Some(remote_id) = item.sync_ref() else {
            return RemoteDelete::Skipped;
        };

        match self.api.delete_booking_item(item.kind, remote_id).await {
            Ok(()) => RemoteDelete::Deleted,
            Err(e) => {
                warn!("Remote delete of {} {} (item {}) failed: {}", item.kind, remote_id, item.id, e);
                RemoteDelete::Failed
            }
        }
    }
}
