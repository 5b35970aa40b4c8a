//! Business hours and booking-window settings.
//!
//! Each organization has one row per weekday and a single settings row.
//! Weekdays are numbered 0–6 starting from Sunday. Open intervals are
//! half-open `[opens_at, closes_at)` in the organization's local time and
//! never cross midnight.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::SlotwiseResult;
use crate::time::{TimeRange, local_instant};

/// Opening hours for one weekday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekdayHours {
    /// 0 = Sunday … 6 = Saturday.
    pub weekday: u8,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub closed: bool,
}

impl WeekdayHours {
    pub fn closed(weekday: u8) -> Self {
        Self {
            weekday,
            opens_at: NaiveTime::MIN,
            closes_at: NaiveTime::MIN,
            closed: true,
        }
    }

    pub fn open(weekday: u8, opens_at: NaiveTime, closes_at: NaiveTime) -> Self {
        Self {
            weekday,
            opens_at,
            closes_at,
            closed: false,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.closed && self.opens_at < self.closes_at
    }
}

/// Validate a full weekly schedule before it is persisted.
pub fn validate_week(week: &[WeekdayHours]) -> Result<(), String> {
    let mut seen = [false; 7];
    for day in week {
        let idx = usize::from(day.weekday);
        if idx > 6 {
            return Err(format!("weekday must be between 0 and 6, got {}", day.weekday));
        }
        if seen[idx] {
            return Err(format!("weekday {} configured more than once", day.weekday));
        }
        seen[idx] = true;
        if [day.opens_at, day.closes_at]
            .iter()
            .any(|t| t.second() != 0 || t.nanosecond() != 0)
        {
            return Err(format!(
                "weekday {}: opening hours must be whole minutes",
                day.weekday
            ));
        }
        if !day.closed && day.opens_at >= day.closes_at {
            return Err(format!(
                "weekday {}: opening time must be before closing time",
                day.weekday
            ));
        }
    }
    Ok(())
}

/// Per-organization booking-window configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingSettings {
    /// Slot granularity in minutes.
    pub slot_minutes: u32,
    /// Minimum distance between now and a booking's start.
    pub min_lead_minutes: u32,
    /// Maximum distance into the future a booking may start.
    pub max_horizon_days: u32,
    pub allow_overlap_per_staff: bool,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            min_lead_minutes: 0,
            max_horizon_days: 60,
            allow_overlap_per_staff: false,
        }
    }
}

impl BookingSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.slot_minutes == 0 {
            return Err("slot_minutes must be at least 1".into());
        }
        if self.max_horizon_days == 0 {
            return Err("max_horizon_days must be at least 1".into());
        }
        Ok(())
    }
}

/// A week of opening hours bound to an organization's UTC offset.
///
/// Weekdays with no configured row are closed.
#[derive(Debug, Clone)]
pub struct WeeklySchedule {
    offset: FixedOffset,
    days: [Option<(NaiveTime, NaiveTime)>; 7],
}

impl WeeklySchedule {
    pub fn new(offset: FixedOffset, week: &[WeekdayHours]) -> Self {
        let mut days = [None; 7];
        for day in week.iter().filter(|d| d.weekday <= 6 && d.is_open()) {
            days[usize::from(day.weekday)] = Some((day.opens_at, day.closes_at));
        }
        Self { offset, days }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The open interval of a local date, as UTC instants, or `None` when
    /// the organization is closed that day. `Invalid` when the date lies at
    /// the edge of the representable range.
    pub fn open_interval(&self, date: NaiveDate) -> SlotwiseResult<Option<TimeRange>> {
        let idx = date.weekday().num_days_from_sunday() as usize;
        let Some((opens, closes)) = self.days[idx] else {
            return Ok(None);
        };
        Ok(Some(TimeRange {
            start: local_instant(self.offset, date, opens)?,
            end: local_instant(self.offset, date, closes)?,
        }))
    }

    /// True iff `range` lies within the open interval of the local weekday
    /// on which it starts. The closing instant itself is outside.
    pub fn contains(&self, range: &TimeRange) -> bool {
        let local_date = range.start.with_timezone(&self.offset).date_naive();
        matches!(self.open_interval(local_date), Ok(Some(open)) if open.covers(range))
    }
}
