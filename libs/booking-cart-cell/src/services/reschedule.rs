use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

use shared_utils::datetime::{compose_date_time, to_24_hour};

use crate::{
    BookingItem, BookingKind, CartError, PeriodTag, RescheduleState, ScheduledAt, Slot, SlotRequest,
};
use crate::services::slots::is_expired_at;

#[derive(Debug, Clone, PartialEq)]
struct RescheduleTarget {
    item_id: String,
    kind: BookingKind,
    target_id: i64,
}

/// State of the reschedule dialog for one cart.
///
/// `Idle -> SlotsLoading -> SlotsReady -> Confirming -> Applied`. Every fetch is tagged
/// with a generation; opening, changing the date or closing bumps it, so a late
/// response from an earlier fetch is dropped by [`RescheduleCoordinator::complete_load`].
#[derive(Debug, Clone)]
pub struct RescheduleCoordinator {
    state: RescheduleState,
    generation: u64,
    target: Option<RescheduleTarget>,
    date: Option<NaiveDate>,
    period: Option<PeriodTag>,
    slots: Vec<Slot>,
    selected: Option<Slot>,
}

impl Default for RescheduleCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RescheduleCoordinator {
    pub fn new() -> Self {
        Self {
            state: RescheduleState::Idle,
            generation: 0,
            target: None,
            date: None,
            period: None,
            slots: Vec::new(),
            selected: None,
        }
    }

    pub fn state(&self) -> RescheduleState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn item_id(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.item_id.as_str())
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn period(&self) -> Option<PeriodTag> {
        self.period
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn selected(&self) -> Option<&Slot> {
        self.selected.as_ref()
    }

    /// Loaded slots narrowed to the active period filter.
    pub fn visible_slots(&self) -> Vec<&Slot> {
        self.slots
            .iter()
            .filter(|slot| self.period.map_or(true, |period| slot.period == period))
            .collect()
    }

    pub fn open(&mut self, item: &BookingItem, date: NaiveDate, period: Option<PeriodTag>) -> SlotRequest {
        let target = RescheduleTarget {
            item_id: item.id.clone(),
            kind: item.kind,
            target_id: item.target_id,
        };
        self.period = period;
        self.start_loading(target, date)
    }

    pub fn change_date(&mut self, date: NaiveDate) -> Result<SlotRequest, CartError> {
        let target = match (&self.state, &self.target) {
            (RescheduleState::SlotsLoading | RescheduleState::SlotsReady, Some(target)) => target.clone(),
            _ => return Err(self.invalid(RescheduleState::SlotsLoading)),
        };
        Ok(self.start_loading(target, date))
    }

    pub fn set_period(&mut self, period: Option<PeriodTag>) {
        self.period = period;
    }

    /// Accepts the slots of a finished fetch. Returns `false` when the fetch is stale.
    pub fn complete_load(&mut self, generation: u64, slots: Vec<Slot>) -> bool {
        if generation != self.generation || self.state != RescheduleState::SlotsLoading {
            debug!(
                "Discarding slot fetch of generation {} (current {}, state {})",
                generation, self.generation, self.state
            );
            return false;
        }

        self.slots = slots;
        self.state = RescheduleState::SlotsReady;
        true
    }

    pub fn select_slot(&mut self, slot_id: &str, now: NaiveDateTime) -> Result<&Slot, CartError> {
        if self.state != RescheduleState::SlotsReady {
            return Err(self.invalid(RescheduleState::SlotsReady));
        }

        let slot = self
            .slots
            .iter()
            .find(|slot| slot.id == slot_id)
            .cloned()
            .ok_or_else(|| CartError::SlotNotFound(slot_id.to_string()))?;

        if is_expired_at(&slot, slot.date, now) {
            return Err(CartError::SlotExpired(slot.label));
        }

        Ok(&*self.selected.insert(slot))
    }

    /// Moves to `Confirming` and produces the canonical schedule for the picked slot.
    pub fn begin_confirm(&mut self) -> Result<(String, ScheduledAt), CartError> {
        if self.state != RescheduleState::SlotsReady {
            return Err(self.invalid(RescheduleState::Confirming));
        }

        let slot = self.selected.as_ref().ok_or(CartError::NoSlotSelected)?;
        let item_id = self
            .item_id()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(RescheduleState::Confirming))?;

        let time_24 = to_24_hour(&slot.start_label);
        let scheduled = compose_date_time(slot.date, &time_24)
            .map(ScheduledAt::new)
            .ok_or_else(|| CartError::InvalidDateTime(format!("{} on {}", slot.start_label, slot.date)))?;

        self.state = RescheduleState::Confirming;
        Ok((item_id, scheduled))
    }

    pub fn mark_applied(&mut self) -> Result<(), CartError> {
        self.transition(RescheduleState::Applied)
    }

    pub fn close(&mut self) {
        self.generation += 1;
        self.state = RescheduleState::Idle;
        self.target = None;
        self.date = None;
        self.period = None;
        self.slots.clear();
        self.selected = None;
    }

    fn start_loading(&mut self, target: RescheduleTarget, date: NaiveDate) -> SlotRequest {
        self.generation += 1;
        self.state = RescheduleState::SlotsLoading;
        self.date = Some(date);
        self.slots.clear();
        self.selected = None;

        let request = SlotRequest {
            generation: self.generation,
            item_id: target.item_id.clone(),
            kind: target.kind,
            target_id: target.target_id,
            date,
        };
        self.target = Some(target);
        request
    }

    fn transition(&mut self, target: RescheduleState) -> Result<(), CartError> {
        if !self.state.can_transition_to(&target) {
            return Err(self.invalid(target));
        }
        self.state = target;
        Ok(())
    }

    fn invalid(&self, to: RescheduleState) -> CartError {
        CartError::InvalidStateTransition {
            from: self.state.to_string(),
            to: to.to_string(),
        }
    }
}
