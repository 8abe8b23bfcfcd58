//! Timestamp parsing, time-zone localization and window checks.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// The only timestamp layout Canvas emits.
const CANVAS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Human readable layout used in notifications, e.g. `November 26, 2024, 11:59 PM`.
pub const DISPLAY_FORMAT: &str = "%B %d, %Y, %I:%M %p";

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// A timestamp did not match the Canvas ISO-8601 layout.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Malformed timestamp {value:?}: {message}")]
pub struct ParseError {
    pub value: String,
    pub message: String,
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Parses a `YYYY-MM-DDTHH:MM:SSZ` timestamp. No other layout is accepted.
pub fn parse_utc(value: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(value, CANVAS_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ParseError {
            value: value.to_string(),
            message: e.to_string(),
        })
}

/// Parses a UTC timestamp and converts it into `tz`.
pub fn parse_and_localize<Tz: TimeZone>(value: &str, tz: &Tz) -> Result<DateTime<Tz>, ParseError> {
    parse_utc(value).map(|utc| utc.with_timezone(tz))
}

/// True iff `now <= due <= now + horizon`. Both bounds are inclusive.
pub fn in_due_window<Tz: TimeZone>(now: DateTime<Utc>, due: &DateTime<Tz>, horizon: TimeDelta) -> bool {
    let due = due.with_timezone(&Utc);
    now <= due && due <= now + horizon
}

/// True iff `graded_at >= now - horizon`.
pub fn in_recency_window(graded_at: DateTime<Utc>, now: DateTime<Utc>, horizon: TimeDelta) -> bool {
    graded_at >= now - horizon
}

/// Removes every `<...>` span. Entities such as `&amp;` are left as-is.
pub fn strip_html(raw: &str) -> String {
    TAG_REGEX.replace_all(raw, "").trim().to_string()
}
