//! Operator-facing time parsing and inclusive date ranges.

use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

use super::InputError;

/// Which end of the day a bare date resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEdge {
    /// Midnight at the start of the day.
    Start,
    /// The last nanosecond of the day.
    End,
}

/// Parses an operator-supplied time in the system time zone.
///
/// Accepts RFC 3339 (`2024-05-01T09:00:00Z`), civil date-times
/// (`2024-05-01 09:00`, `2024-05-01T09:00`), and bare dates (`2024-05-01`).
pub fn parse_timestamp(input: &str, edge: DayEdge) -> Result<Timestamp, InputError> {
    parse_timestamp_in(input, &TimeZone::system(), edge)
}

/// Like [`parse_timestamp`], but civil inputs are interpreted in `tz`.
pub fn parse_timestamp_in(
    input: &str,
    tz: &TimeZone,
    edge: DayEdge,
) -> Result<Timestamp, InputError> {
    let input = input.trim();

    if let Ok(ts) = input.parse::<Timestamp>() {
        return Ok(ts);
    }

    // Bare dates are exactly `YYYY-MM-DD`.
    if input.len() == 10
        && let Ok(date) = input.parse::<Date>()
    {
        return day_edge(date, tz, edge).ok_or_else(|| InputError::LocalTime(input.to_string()));
    }

    let civil = input
        .parse::<DateTime>()
        .map_err(|_| InputError::Timestamp(input.to_string()))?;
    civil
        .to_zoned(tz.clone())
        .map(|z| z.timestamp())
        .map_err(|_| InputError::LocalTime(input.to_string()))
}

fn day_edge(date: Date, tz: &TimeZone, edge: DayEdge) -> Option<Timestamp> {
    match edge {
        DayEdge::Start => date.to_zoned(tz.clone()).ok().map(|z| z.timestamp()),
        DayEdge::End => {
            let next = date.tomorrow().ok()?.to_zoned(tz.clone()).ok()?;
            next.timestamp()
                .checked_sub(SignedDuration::from_nanos(1))
                .ok()
        }
    }
}

/// An inclusive span of time: `start <= t <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: Timestamp,
    end: Timestamp,
}

impl DateRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, InputError> {
        if start > end {
            return Err(InputError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range with either side open: missing bounds extend to the limits of time.
    pub fn bounded(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<Self, InputError> {
        Self::new(start.unwrap_or(Timestamp::MIN), end.unwrap_or(Timestamp::MAX))
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }
}
