use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::error::BookingError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A half-open `[start, end)` interval with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    #[serde(with = "minute_format")]
    start: NaiveDateTime,
    #[serde(with = "minute_format")]
    end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        intervals_overlap(self.start, self.end, other.start, other.end)
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    !(b_end <= a_start || b_start >= a_end)
}

/// Combines a calendar date with entry and exit clock times.
///
/// An exit at or before the entry is read as leaving on the following day, so
/// `23:30 -> 00:30` is one hour and `09:00 -> 09:00` is a full 24 hours.
/// Fails only when the following day is past the calendar's range.
pub fn normalize_interval(
    date: NaiveDate,
    entry: NaiveTime,
    exit: NaiveTime,
) -> Result<TimeRange, BookingError> {
    let entry = truncate_time(entry);
    let exit = truncate_time(exit);
    let start = date.and_time(entry);
    let mut end = date.and_time(exit);
    if exit <= entry {
        end = end
            .checked_add_signed(Duration::days(1))
            .ok_or(BookingError::InvalidInterval { start, end })?;
    }
    Ok(TimeRange { start, end })
}

/// Drops seconds and sub-seconds; the store keeps minute resolution only.
pub fn truncate_to_minute(instant: NaiveDateTime) -> NaiveDateTime {
    instant.date().and_time(truncate_time(instant.time()))
}

fn truncate_time(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// Serializes timestamps as `YYYY-MM-DD HH:MM`.
pub mod minute_format {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }
}
