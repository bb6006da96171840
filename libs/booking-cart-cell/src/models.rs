use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::datetime::{format_12_hour, SCHEDULED_AT_FORMAT};

/// Id prefix reserved for items created in this session that were never synced.
pub const DRAFT_ID_PREFIX: &str = "draft-";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    #[serde(alias = "consultation", alias = "Appointment")]
    Appointment,

    #[serde(alias = "diagnostic", alias = "lab_test", alias = "DiagnosticTest")]
    DiagnosticTest,
}

impl BookingKind {
    /// Path segment used by the scheduling service's cart endpoints.
    pub fn cart_segment(&self) -> &'static str {
        match self {
            BookingKind::Appointment => "appointments",
            BookingKind::DiagnosticTest => "diagnostics",
        }
    }
}

impl fmt::Display for BookingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingKind::Appointment => write!(f, "appointment"),
            BookingKind::DiagnosticTest => write!(f, "diagnostic_test"),
        }
    }
}

/// Canonical `YYYY-MM-DD HH:MM:SS` wall-clock value of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledAt(NaiveDateTime);

impl ScheduledAt {
    pub fn new(value: NaiveDateTime) -> Self {
        Self(value.with_nanosecond(0).unwrap_or(value))
    }

    pub fn from_parts(date: NaiveDate, time: NaiveTime) -> Self {
        Self::new(date.and_time(time))
    }

    pub fn value(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.0.time()
    }

    /// 12-hour display label, e.g. `2:30 PM`.
    pub fn time_label(&self) -> String {
        format_12_hour(self.0.time())
    }
}

impl fmt::Display for ScheduledAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(SCHEDULED_AT_FORMAT))
    }
}

impl FromStr for ScheduledAt {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Self::new(dt.naive_local()));
        }

        [SCHEDULED_AT_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(Self::new)
            .ok_or_else(|| format!("'{}' is not a valid schedule (expected YYYY-MM-DD HH:MM:SS)", raw))
    }
}

impl Serialize for ScheduledAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScheduledAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingItem {
    pub id: String,
    pub kind: BookingKind,
    #[serde(default, alias = "remoteId")]
    pub remote_id: Option<i64>,
    #[serde(alias = "subjectName")]
    pub subject_name: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(alias = "targetId")]
    pub target_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default, alias = "scheduledAt")]
    pub scheduled_at: Option<ScheduledAt>,
}

impl BookingItem {
    /// Item that already has a server-side record; its id is derived from that record.
    pub fn from_remote(kind: BookingKind, remote_id: i64, target_id: i64, subject_name: &str) -> Self {
        Self {
            id: format!("{}-{}", kind, remote_id),
            kind,
            remote_id: Some(remote_id),
            subject_name: subject_name.to_string(),
            relationship: "self".to_string(),
            target_id,
            title: String::new(),
            location: None,
            price: 0.0,
            scheduled_at: None,
        }
    }

    /// Purely local item with a synthesized id; never sent to the remote store.
    pub fn draft(kind: BookingKind, target_id: i64, subject_name: &str) -> Self {
        Self {
            id: format!("{}{}", DRAFT_ID_PREFIX, Uuid::new_v4()),
            kind,
            remote_id: None,
            subject_name: subject_name.to_string(),
            relationship: "self".to_string(),
            target_id,
            title: String::new(),
            location: None,
            price: 0.0,
            scheduled_at: None,
        }
    }

    pub fn is_local_draft(&self) -> bool {
        self.remote_id.is_none() || self.id.starts_with(DRAFT_ID_PREFIX)
    }

    /// Remote id to use for update/delete calls, if the item may touch the remote store at all.
    pub fn sync_ref(&self) -> Option<i64> {
        if self.id.starts_with(DRAFT_ID_PREFIX) {
            return None;
        }
        self.remote_id
    }

    pub fn scheduled_date(&self) -> Option<NaiveDate> {
        self.scheduled_at.map(|s| s.date())
    }

    pub fn scheduled_time_label(&self) -> Option<String> {
        self.scheduled_at.map(|s| s.time_label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeriodTag {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl PeriodTag {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => PeriodTag::Morning,
            12..=16 => PeriodTag::Afternoon,
            17..=20 => PeriodTag::Evening,
            _ => PeriodTag::Night,
        }
    }
}

impl fmt::Display for PeriodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodTag::Morning => write!(f, "morning"),
            PeriodTag::Afternoon => write!(f, "afternoon"),
            PeriodTag::Evening => write!(f, "evening"),
            PeriodTag::Night => write!(f, "night"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: String,
    pub label: String,
    pub start_label: String,
    pub end_label: Option<String>,
    pub date: NaiveDate,
    pub period: PeriodTag,
}

impl Slot {
    pub fn start_time(&self) -> Option<NaiveTime> {
        shared_utils::datetime::parse_time(&self.start_label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RescheduleState {
    Idle,
    SlotsLoading,
    SlotsReady,
    Confirming,
    Applied,
}

impl RescheduleState {
    pub fn can_transition_to(&self, target: &RescheduleState) -> bool {
        use RescheduleState::*;
        match (self, target) {
            (_, Idle) => true,
            (_, SlotsLoading) => true,
            (SlotsLoading, SlotsReady) => true,
            (SlotsReady, Confirming) => true,
            (Confirming, Applied) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RescheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Everything needed to run one availability fetch, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRequest {
    pub generation: u64,
    pub item_id: String,
    pub kind: BookingKind,
    pub target_id: i64,
    pub date: NaiveDate,
}

/// Result of an optimistic reschedule commit.
#[derive(Debug, Clone, PartialEq)]
pub struct RescheduleCommit {
    pub item_id: String,
    pub kind: BookingKind,
    pub sync_ref: Option<i64>,
    pub scheduled_at: ScheduledAt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartChange {
    Merged { added: usize, replaced: usize },
    Rescheduled { item_id: String, scheduled_at: ScheduledAt },
    Removed { item_id: String },
    Cleared { removed: usize },
    SelectionChanged { selected: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEvent {
    pub subject_id: String,
    pub change: CartChange,
    pub item_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartSummary {
    pub item_count: usize,
    pub selected_count: usize,
    pub selected_total: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClearReport {
    pub removed: usize,
    pub attempted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOperation {
    UpdateSchedule { kind: BookingKind, remote_id: i64, scheduled_at: ScheduledAt },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncJob {
    pub job_id: Uuid,
    pub subject_id: String,
    pub item_id: String,
    pub operation: SyncOperation,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl SyncJob {
    pub fn new(subject_id: &str, item_id: &str, operation: SyncOperation, max_retries: u32) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            subject_id: subject_id.to_string(),
            item_id: item_id.to_string(),
            operation,
            retry_count: 0,
            max_retries,
            created_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Synced { attempts: u32 },
    Failed { attempts: u32, error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    pub sync_max_retries: u32,
    pub sync_retry_delay_ms: u64,
    pub event_capacity: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            sync_max_retries: 3,
            sync_retry_delay_ms: 500,
            event_capacity: 256,
        }
    }
}

impl CartConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            sync_max_retries: config.sync_max_retries,
            sync_retry_delay_ms: config.sync_retry_delay_ms,
            event_capacity: config.cart_event_capacity.max(1),
        }
    }
}

// HTTP payloads

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<BookingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRescheduleRequest {
    pub date: NaiveDate,
    pub period: Option<PeriodTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDateRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPeriodRequest {
    pub period: Option<PeriodTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectSlotRequest {
    pub slot_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAction {
    Select,
    Deselect,
    Toggle,
    All,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub action: SelectionAction,
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}
