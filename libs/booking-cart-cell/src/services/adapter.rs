//! Boundary adapters for the scheduling service's availability payloads.
//!
//! The backend has shipped several response layouts for the same data, so each
//! payload is matched against an ordered list of shapes, first match wins:
//!
//! 1. a bare JSON array of records;
//! 2. an object holding the array under a shared key, tried in the order
//!    `data`, `results`, `slots`, `availability`;
//! 3. an object holding the array under one of the kind-specific keys
//!    ([`AvailabilityAdapter::kind_keys`]);
//! 4. the first property, in document order, whose value is an array.
//!
//! Anything else is [`AvailabilityShape::Unrecognized`] and yields no records.
//! Individual records are then read with [`RawSlotRecord::from_value`], which
//! applies the same first-match rule to the aliased id/start/end fields.

use serde_json::Value;

use crate::BookingKind;

pub const SHARED_KEYS: [&str; 4] = ["data", "results", "slots", "availability"];

const APPOINTMENT_KEYS: [&str; 3] = ["available_slots", "doctor_slots", "time_slots"];
const DIAGNOSTIC_KEYS: [&str; 3] = ["test_slots", "center_slots", "available_times"];

const ID_FIELDS: [&str; 4] = ["id", "slot_id", "slotId", "availability_id"];
const START_FIELDS: [&str; 6] = ["start_time", "startTime", "start", "time", "slot_time", "from"];
const END_FIELDS: [&str; 4] = ["end_time", "endTime", "end", "to"];

const NO_RECORDS: &[Value] = &[];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityShape {
    BareArray,
    SharedKey(&'static str),
    KindKey(&'static str),
    FirstArrayProperty(String),
    Unrecognized,
}

#[derive(Debug, Clone, Copy)]
pub struct AvailabilityAdapter {
    kind: BookingKind,
}

impl AvailabilityAdapter {
    pub fn for_kind(kind: BookingKind) -> Self {
        Self { kind }
    }

    pub fn kind_keys(&self) -> &'static [&'static str] {
        match self.kind {
            BookingKind::Appointment => &APPOINTMENT_KEYS,
            BookingKind::DiagnosticTest => &DIAGNOSTIC_KEYS,
        }
    }

    pub fn detect(&self, raw: &Value) -> AvailabilityShape {
        self.locate(raw).0
    }

    /// Returns the matched shape together with the records it points at.
    pub fn locate<'a>(&self, raw: &'a Value) -> (AvailabilityShape, &'a [Value]) {
        let object = match raw {
            Value::Array(records) => return (AvailabilityShape::BareArray, records.as_slice()),
            Value::Object(object) => object,
            _ => return (AvailabilityShape::Unrecognized, NO_RECORDS),
        };

        for key in SHARED_KEYS {
            if let Some(Value::Array(records)) = object.get(key) {
                return (AvailabilityShape::SharedKey(key), records.as_slice());
            }
        }

        for &key in self.kind_keys() {
            if let Some(Value::Array(records)) = object.get(key) {
                return (AvailabilityShape::KindKey(key), records.as_slice());
            }
        }

        object
            .iter()
            .find_map(|(key, value)| match value {
                Value::Array(records) => Some((AvailabilityShape::FirstArrayProperty(key.clone()), records.as_slice())),
                _ => None,
            })
            .unwrap_or((AvailabilityShape::Unrecognized, NO_RECORDS))
    }

    pub fn records(&self, raw: &Value) -> Vec<RawSlotRecord> {
        let (_, records) = self.locate(raw);
        records.iter().filter_map(RawSlotRecord::from_value).collect()
    }
}

/// One availability record with its aliased fields resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSlotRecord {
    pub id: Option<String>,
    pub start: String,
    pub end: Option<String>,
}

impl RawSlotRecord {
    /// `None` when the record has no usable start time.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(start) if !start.trim().is_empty() => Some(Self {
                id: None,
                start: start.trim().to_string(),
                end: None,
            }),
            Value::Object(_) => {
                let start = first_text(value, &START_FIELDS)?;
                Some(Self {
                    id: first_text(value, &ID_FIELDS),
                    start,
                    end: first_text(value, &END_FIELDS),
                })
            }
            _ => None,
        }
    }
}

fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
