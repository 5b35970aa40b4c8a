//! Half-open time intervals and organization-local time projection.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SlotwiseError, SlotwiseResult};

/// A half-open interval `[start, end)` of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> SlotwiseResult<Self> {
        if start >= end {
            return Err(SlotwiseError::invalid("interval end must be after its start"));
        }
        Ok(Self { start, end })
    }

    pub fn starting_at(start: DateTime<Utc>, minutes: i64) -> SlotwiseResult<Self> {
        let end = start
            .checked_add_signed(Duration::minutes(minutes))
            .ok_or_else(|| out_of_range(start))?;
        Self::new(start, end)
    }

    /// `[a,b)` and `[c,d)` overlap iff `a < d && c < b`.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff `other` lies entirely inside `self`.
    pub fn covers(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Parse an organization timezone stored as a fixed UTC offset
/// (`+02:00`, `-05:30`, `Z`, or `UTC`).
pub fn parse_offset(raw: &str) -> SlotwiseResult<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
        return Ok(Utc.fix());
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|_| SlotwiseError::invalid(format!("unsupported timezone offset: {raw}")))
}

fn out_of_range(value: impl std::fmt::Display) -> SlotwiseError {
    SlotwiseError::invalid(format!("{value} is outside the supported date range"))
}

/// The UTC instant of a wall-clock time on a local date. `Invalid` when
/// the instant falls outside the representable range.
pub fn local_instant(
    offset: FixedOffset,
    date: NaiveDate,
    time: NaiveTime,
) -> SlotwiseResult<DateTime<Utc>> {
    date.and_time(time)
        .checked_sub_offset(offset)
        .map(|utc| Utc.from_utc_datetime(&utc))
        .ok_or_else(|| out_of_range(date))
}

/// The `[00:00, next 00:00)` span of a local date, in UTC.
pub fn local_day(offset: FixedOffset, date: NaiveDate) -> SlotwiseResult<TimeRange> {
    let start = local_instant(offset, date, NaiveTime::MIN)?;
    let end = start
        .checked_add_signed(Duration::days(1))
        .ok_or_else(|| out_of_range(date))?;
    Ok(TimeRange { start, end })
}
