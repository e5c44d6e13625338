//! Column value payloads for date and timeline columns.
//!
//! Column values arrive as opaque JSON strings. Parsing fails closed:
//! nulls, empty strings and shape mismatches all read as "no value",
//! never as errors.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A date column value: `{"date":"2026-03-01","time":"10:00:00"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateValue {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
}

/// A timeline column value: `{"from":"2026-03-01","to":"2026-03-15"}`.
/// Both ends are required for the value to count as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineValue {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Extract the calendar date from a raw date column value.
pub fn parse_date_value(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    serde_json::from_str::<DateValue>(raw).ok().map(|v| v.date)
}

/// Parse a raw timeline column value.
pub fn parse_timeline_value(raw: Option<&str>) -> Option<TimelineValue> {
    let raw = raw?;
    serde_json::from_str::<TimelineValue>(raw).ok()
}
