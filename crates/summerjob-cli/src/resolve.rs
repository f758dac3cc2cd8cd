//! Argument parsing shared by the command handlers.
//!
//! IDs, days and clock times arrive as plain strings so that a typo is
//! reported with the name of the thing the operator meant.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

/// Parse a UUID, naming `what` in the error.
pub fn parse_id(what: &str, input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).with_context(|| format!("invalid {what} ID: {input:?}"))
}

/// Parse every entry of `inputs`, splitting comma-separated values.
pub fn parse_ids(what: &str, inputs: &[String]) -> Result<Vec<Uuid>> {
    inputs
        .iter()
        .flat_map(|s| s.split(','))
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_id(what, s))
        .collect()
}

/// Parse a `YYYY-MM-DD` day.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid day {input:?}, expected YYYY-MM-DD"))
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .with_context(|| format!("invalid time {input:?}, expected HH:MM"))
}

/// Minutes after midnight of an `HH:MM` time.
pub fn parse_minute_of_day(input: &str) -> Result<i32> {
    let t = parse_time(input)?;
    // hour < 24 and minute < 60, so this cannot overflow.
    Ok((t.hour() * 60 + t.minute()) as i32)
}
