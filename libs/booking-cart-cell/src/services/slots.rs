use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use tracing::{debug, warn};

use shared_utils::datetime::{parse_time, to_12_hour};

use crate::{BookingItem, BookingKind, PeriodTag, Slot, SlotRequest};
use crate::services::adapter::{AvailabilityAdapter, AvailabilityShape, RawSlotRecord};
use crate::services::remote::SchedulingApi;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub struct SlotCatalog {
    api: Arc<dyn SchedulingApi>,
    clock: Arc<dyn Clock>,
}

impl SlotCatalog {
    pub fn new(api: Arc<dyn SchedulingApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub async fn fetch_slots(&self, item: &BookingItem, date: NaiveDate) -> Vec<Slot> {
        self.fetch(item.kind, item.target_id, date).await
    }

    pub async fn fetch_for(&self, request: &SlotRequest) -> Vec<Slot> {
        self.fetch(request.kind, request.target_id, request.date).await
    }

    /// Never fails: an unreachable backend or an unknown payload shape both mean "no slots".
    pub async fn fetch(&self, kind: BookingKind, target_id: i64, date: NaiveDate) -> Vec<Slot> {
        match self.api.get_availability(kind, target_id, date).await {
            Ok(raw) => normalize_slots(kind, target_id, date, &raw),
            Err(e) => {
                warn!("Availability query for {} {} on {} failed: {}", kind, target_id, date, e);
                Vec::new()
            }
        }
    }

    pub fn is_expired(&self, slot: &Slot, reference_date: NaiveDate) -> bool {
        is_expired_at(slot, reference_date, self.clock.now())
    }
}

pub fn normalize_slots(kind: BookingKind, target_id: i64, date: NaiveDate, raw: &Value) -> Vec<Slot> {
    let adapter = AvailabilityAdapter::for_kind(kind);
    let (shape, records) = adapter.locate(raw);

    if shape == AvailabilityShape::Unrecognized {
        warn!("Unrecognized availability payload for {} {} on {}", kind, target_id, date);
        return Vec::new();
    }

    let slots: Vec<Slot> = records
        .iter()
        .filter_map(|value| {
            let record = RawSlotRecord::from_value(value);
            if record.is_none() {
                debug!("Skipping availability record without a start time: {}", value);
            }
            record
        })
        .map(|record| build_slot(target_id, date, record))
        .collect();

    debug!("Normalized {} slots ({:?}) for {} {} on {}", slots.len(), shape, kind, target_id, date);
    slots
}

fn build_slot(target_id: i64, date: NaiveDate, record: RawSlotRecord) -> Slot {
    let start_label = to_12_hour(&record.start);
    let end_label = record.end.as_deref().map(to_12_hour);

    let label = match &end_label {
        Some(end) => format!("{} - {}", start_label, end),
        None => start_label.clone(),
    };

    let id = record
        .id
        .unwrap_or_else(|| slot_key(target_id, date, &start_label));

    let period = classify_label(&start_label);

    Slot {
        id,
        label,
        start_label,
        end_label,
        date,
        period,
    }
}

/// Stable identity for slots the backend did not number.
pub fn slot_key(target_id: i64, date: NaiveDate, start_label: &str) -> String {
    let compact: String = start_label.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}-{}-{}", target_id, date.format("%Y-%m-%d"), compact.to_uppercase())
}

pub fn classify_period(slot: &Slot) -> PeriodTag {
    classify_label(&slot.start_label)
}

fn classify_label(start_label: &str) -> PeriodTag {
    // Unreadable times fall into the catch-all bucket.
    parse_time(start_label)
        .map(|time| PeriodTag::from_hour(time.hour()))
        .unwrap_or(PeriodTag::Night)
}

/// A slot is expired when `reference_date` at the slot's time of day lies strictly before `now`.
pub fn is_expired_at(slot: &Slot, reference_date: NaiveDate, now: NaiveDateTime) -> bool {
    match slot.start_time() {
        Some(time) => reference_date.and_time(time) < now,
        None => false,
    }
}
