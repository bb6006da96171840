//! Wall-clock time helpers shared by the portal's display and booking code.
//!
//! Remote services hand back times in several notations (`14:00`, `14:00:00`,
//! `2:00 PM`, `02:00pm`, full timestamps). Everything here parses into
//! [`NaiveTime`] and renders either the 12-hour display form (`2:00 PM`) or
//! the 24-hour form (`14:00`). The lossy `to_*` helpers never fail: input that
//! cannot be understood is passed through unchanged so display code never crashes.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([AaPp])\.?\s*[Mm]?\.?$|^(\d{1,2}):(\d{2})(?::(\d{2}))?$")
        .expect("time pattern is valid")
});

static MERIDIEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d\s*[ap]\.?m\.?\s*$").expect("meridiem pattern is valid")
});

pub const SCHEDULED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// True when the string already carries an AM/PM marker.
pub fn has_meridiem(raw: &str) -> bool {
    MERIDIEM_RE.is_match(raw.trim())
}

/// Parses a time of day from 12-hour, 24-hour or timestamp notation.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = TIME_RE.captures(trimmed) {
        if let Some(marker) = caps.get(4) {
            let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
            let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
            let second: u32 = caps.get(3).map_or(Ok(0), |s| s.as_str().parse()).ok()?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let is_pm = marker.as_str().eq_ignore_ascii_case("p");
            let hour = match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, true) => h + 12,
                (h, false) => h,
            };
            return NaiveTime::from_hms_opt(hour, minute, second);
        }

        let hour: u32 = caps.get(5)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(6)?.as_str().parse().ok()?;
        let second: u32 = caps.get(7).map_or(Ok(0), |s| s.as_str().parse()).ok()?;
        return NaiveTime::from_hms_opt(hour, minute, second);
    }

    parse_timestamp(trimmed).map(|dt| dt.time())
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", SCHEDULED_AT_FORMAT, "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// `14:05` -> `2:05 PM`
pub fn format_12_hour(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    format!("{}:{:02} {}", hour, time.minute(), if is_pm { "PM" } else { "AM" })
}

/// `2:05 PM` -> `14:05`
pub fn format_24_hour(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Display form of an arbitrary time string; unknown input is returned as given.
pub fn to_12_hour(raw: &str) -> String {
    if has_meridiem(raw) {
        return raw.trim().to_string();
    }
    parse_time(raw).map(format_12_hour).unwrap_or_else(|| raw.to_string())
}

/// 24-hour form of an arbitrary time string; unknown input is returned as given.
pub fn to_24_hour(raw: &str) -> String {
    parse_time(raw).map(format_24_hour).unwrap_or_else(|| raw.to_string())
}

/// Joins a calendar date and a time of day into the canonical `YYYY-MM-DD HH:MM:SS` form.
pub fn compose_date_time(date: NaiveDate, time_label: &str) -> Option<NaiveDateTime> {
    parse_time(time_label).map(|time| date.and_time(time.with_second(0).unwrap_or(time)))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
