use std::sync::Arc;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{
    BookingItem, CartChange, CartConfig, CartError, CartSummary, ClearReport, PeriodTag,
    RescheduleCommit, RescheduleState, Slot, SlotRequest, SyncOperation, SyncOutcome,
};
use crate::services::merger::{merge_with_stats, MergeOutcome};
use crate::services::notifications::{CartEventReceiver, CartNotificationService};
use crate::services::remote::SchedulingApi;
use crate::services::removal::{RemoteDelete, RemovalOrchestrator};
use crate::services::repository::ItemRepository;
use crate::services::reschedule::RescheduleCoordinator;
use crate::services::selection::SelectionSet;
use crate::services::slots::{Clock, SlotCatalog};
use crate::services::sync::SyncDispatcher;

/// Collaborators shared by every subject's cart.
#[derive(Clone)]
pub struct CartContext {
    pub repository: ItemRepository,
    pub catalog: Arc<SlotCatalog>,
    pub removal: RemovalOrchestrator,
    pub sync: SyncDispatcher,
    pub notifications: CartNotificationService,
}

impl CartContext {
    pub fn new(
        repository: ItemRepository,
        api: Arc<dyn SchedulingApi>,
        clock: Arc<dyn Clock>,
        config: &CartConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(SlotCatalog::new(api.clone(), clock)),
            removal: RemovalOrchestrator::new(api.clone(), repository.clone()),
            sync: SyncDispatcher::new(api, config),
            notifications: CartNotificationService::new(config.event_capacity),
            repository,
        }
    }
}

/// What a confirmed reschedule did locally, plus a handle on the remote sync if one was started.
#[derive(Debug)]
pub struct RescheduleOutcome {
    pub commit: RescheduleCommit,
    pub item: BookingItem,
    pub sync: Option<JoinHandle<SyncOutcome>>,
}

/// One subject's cart: items, checkout selection and the reschedule dialog.
///
/// All mutations take `&mut self`, so whoever owns the engine serializes them.
/// Remote work either completes before the mutation returns (removal) or is handed to
/// the sync dispatcher and never touches the engine again (reschedule).
pub struct CartEngine {
    subject_id: String,
    items: Vec<BookingItem>,
    selection: SelectionSet,
    coordinator: RescheduleCoordinator,
    context: CartContext,
}

impl CartEngine {
    pub async fn load(subject_id: &str, context: CartContext) -> Self {
        let items = context.repository.load(subject_id).await;
        debug!("Loaded cart for subject {} with {} items", subject_id, items.len());

        Self {
            subject_id: subject_id.to_string(),
            items,
            selection: SelectionSet::new(),
            coordinator: RescheduleCoordinator::new(),
            context,
        }
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn items(&self) -> &[BookingItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&BookingItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn coordinator(&self) -> &RescheduleCoordinator {
        &self.coordinator
    }

    /// Nothing in the cart and no reschedule dialog open.
    pub fn is_idle(&self) -> bool {
        self.items.is_empty() && self.coordinator.state() == RescheduleState::Idle
    }

    pub fn subscribe(&self) -> CartEventReceiver {
        self.context.notifications.subscribe()
    }

    pub fn summary(&self) -> CartSummary {
        let selected = self.selection.selected_items(&self.items);
        CartSummary {
            item_count: self.items.len(),
            selected_count: selected.len(),
            selected_total: selected.iter().map(|item| item.price).sum(),
        }
    }

    /// Merges items handed off by a booking flow and persists the result.
    #[instrument(skip(self, incoming), fields(subject_id = %self.subject_id, incoming = incoming.len()))]
    pub async fn add_items(&mut self, incoming: Vec<BookingItem>) -> MergeOutcome {
        let (valid, rejected): (Vec<_>, Vec<_>) = incoming.into_iter().partition(|item| !item.id.trim().is_empty());
        if !rejected.is_empty() {
            warn!("Ignoring {} cart items without an id", rejected.len());
        }

        let outcome = merge_with_stats(&self.items, &valid);
        self.items = outcome.items.clone();
        self.context.repository.save(&self.subject_id, &self.items).await;

        info!("Merged {} new and {} replaced items into cart", outcome.added, outcome.replaced);
        self.notify(CartChange::Merged { added: outcome.added, replaced: outcome.replaced });
        outcome
    }

    pub async fn remove(&mut self, id: &str) -> Result<RemoteDelete, CartError> {
        let remote = self
            .context
            .removal
            .remove(&self.subject_id, &mut self.items, &mut self.selection, id)
            .await?;

        if self.coordinator.item_id() == Some(id) {
            self.coordinator.close();
        }

        self.notify(CartChange::Removed { item_id: id.to_string() });
        Ok(remote)
    }

    pub async fn clear_all(&mut self) -> ClearReport {
        let report = self
            .context
            .removal
            .clear_all(&self.subject_id, &mut self.items, &mut self.selection)
            .await;

        self.coordinator.close();
        self.notify(CartChange::Cleared { removed: report.removed });
        report
    }

    pub fn select(&mut self, id: &str) -> Result<(), CartError> {
        if !self.selection.select(&self.items, id) {
            return Err(CartError::ItemNotFound(id.to_string()));
        }
        self.notify_selection();
        Ok(())
    }

    pub fn deselect(&mut self, id: &str) {
        if self.selection.deselect(id) {
            self.notify_selection();
        }
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool, CartError> {
        if self.item(id).is_none() {
            return Err(CartError::ItemNotFound(id.to_string()));
        }
        let selected = self.selection.toggle(&self.items, id);
        self.notify_selection();
        Ok(selected)
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.items);
        self.notify_selection();
    }

    pub fn select_none(&mut self) {
        self.selection.select_none();
        self.notify_selection();
    }

    /// Opens the reschedule dialog. The returned request must be fetched and handed back
    /// through [`CartEngine::finish_slot_load`].
    pub fn begin_reschedule(
        &mut self,
        item_id: &str,
        date: NaiveDate,
        period: Option<PeriodTag>,
    ) -> Result<SlotRequest, CartError> {
        let item = self
            .items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| CartError::ItemNotFound(item_id.to_string()))?;

        let request = self.coordinator.open(item, date, period);
        debug!("Opened reschedule for item {} on {} (generation {})", item_id, date, request.generation);
        Ok(request)
    }

    pub fn change_reschedule_date(&mut self, date: NaiveDate) -> Result<SlotRequest, CartError> {
        self.coordinator.change_date(date)
    }

    pub fn set_reschedule_period(&mut self, period: Option<PeriodTag>) {
        self.coordinator.set_period(period);
    }

    pub fn finish_slot_load(&mut self, generation: u64, slots: Vec<Slot>) -> bool {
        self.coordinator.complete_load(generation, slots)
    }

    /// Convenience for callers that hold the engine across the fetch.
    pub async fn load_slots(&mut self, request: &SlotRequest) -> bool {
        let slots = self.context.catalog.fetch_for(request).await;
        self.finish_slot_load(request.generation, slots)
    }

    pub async fn open_reschedule(
        &mut self,
        item_id: &str,
        date: NaiveDate,
        period: Option<PeriodTag>,
    ) -> Result<SlotRequest, CartError> {
        let request = self.begin_reschedule(item_id, date, period)?;
        self.load_slots(&request).await;
        Ok(request)
    }

    pub fn visible_slots(&self) -> Vec<&Slot> {
        self.coordinator.visible_slots()
    }

    pub fn select_slot(&mut self, slot_id: &str) -> Result<Slot, CartError> {
        let now = self.context.catalog.clock().now();
        self.coordinator.select_slot(slot_id, now).cloned()
    }

    /// Applies the selected slot locally, then hands the remote update to the sync dispatcher.
    ///
    /// The local write is final: a failing remote update is retried and logged, never rolled back.
    #[instrument(skip(self), fields(subject_id = %self.subject_id))]
    pub async fn confirm_reschedule(&mut self) -> Result<RescheduleOutcome, CartError> {
        let (item_id, scheduled_at) = self.coordinator.begin_confirm()?;

        let Some(item) = self.items.iter_mut().find(|item| item.id == item_id) else {
            self.coordinator.close();
            return Err(CartError::ItemNotFound(item_id));
        };

        item.scheduled_at = Some(scheduled_at);
        let item = item.clone();

        self.context.repository.save(&self.subject_id, &self.items).await;
        info!("Rescheduled cart item {} to {}", item.id, scheduled_at);
        self.notify(CartChange::Rescheduled { item_id: item.id.clone(), scheduled_at });

        let sync = item.sync_ref().map(|remote_id| {
            self.context.sync.dispatch(
                &self.subject_id,
                &item.id,
                SyncOperation::UpdateSchedule { kind: item.kind, remote_id, scheduled_at },
            )
        });
        if sync.is_none() {
            debug!("Cart item {} is local only; skipping remote update", item.id);
        }

        self.coordinator.mark_applied()?;

        let commit = RescheduleCommit {
            item_id: item.id.clone(),
            kind: item.kind,
            sync_ref: item.sync_ref(),
            scheduled_at,
        };

        Ok(RescheduleOutcome { commit, item, sync })
    }

    pub fn close_reschedule(&mut self) {
        self.coordinator.close();
    }

    fn notify_selection(&self) {
        self.notify(CartChange::SelectionChanged { selected: self.selection.len() });
    }

    fn notify(&self, change: CartChange) {
        self.context.notifications.notify(&self.subject_id, change, self.items.len());
    }
}
