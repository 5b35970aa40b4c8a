//! Available start times for a local date.
//!
//! Candidates are laid out from the day's opening time every
//! `slot_minutes`, as long as the requested duration still fits before
//! closing. Candidates inside the lead time or past the horizon are
//! dropped, then every candidate whose interval intersects a live
//! booking is removed. The output is ascending and depends only on the
//! stored data and `now`.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::business_hours::{BookingSettings, WeeklySchedule};
use slotwise_core::repository::{BookingRepository, BusinessHoursRepository, Catalog};
use slotwise_core::time::TimeRange;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;

/// Candidate starts on `date` before busy intervals are considered.
pub fn candidate_starts(
    schedule: &WeeklySchedule,
    settings: &BookingSettings,
    date: NaiveDate,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> SlotwiseResult<Vec<DateTime<Utc>>> {
    let Some(open) = schedule.open_interval(date)? else {
        return Ok(Vec::new());
    };
    if duration_minutes <= 0 || settings.slot_minutes == 0 {
        return Ok(Vec::new());
    }

    let step = Duration::minutes(i64::from(settings.slot_minutes));
    let duration = Duration::minutes(duration_minutes);
    let earliest = now + Duration::minutes(i64::from(settings.min_lead_minutes));
    let latest = now + Duration::days(i64::from(settings.max_horizon_days));

    let mut starts = Vec::new();
    let mut start = open.start;
    while let Some(end) = start.checked_add_signed(duration) {
        if end > open.end {
            break;
        }
        if start >= earliest && start <= latest {
            starts.push(start);
        }
        match start.checked_add_signed(step) {
            Some(next) => start = next,
            None => break,
        }
    }
    Ok(starts)
}

/// Remove candidates whose `[s, s + duration)` intersects any busy range.
pub fn drop_busy(
    candidates: Vec<DateTime<Utc>>,
    duration_minutes: i64,
    busy: &[TimeRange],
) -> Vec<DateTime<Utc>> {
    let duration = Duration::minutes(duration_minutes);
    candidates
        .into_iter()
        .filter(|start| {
            let slot = TimeRange {
                start: *start,
                end: *start + duration,
            };
            !busy.iter().any(|b| b.overlaps(&slot))
        })
        .collect()
}

/// Computes available slots from the stored hours, settings and bookings.
pub struct SlotEngine<'a, C, H, B> {
    catalog: &'a C,
    hours: &'a H,
    bookings: &'a B,
    clock: &'a dyn Clock,
}

impl<'a, C, H, B> SlotEngine<'a, C, H, B>
where
    C: Catalog,
    H: BusinessHoursRepository,
    B: BookingRepository,
{
    pub fn new(catalog: &'a C, hours: &'a H, bookings: &'a B, clock: &'a dyn Clock) -> Self {
        Self {
            catalog,
            hours,
            bookings,
            clock,
        }
    }

    /// Start instants on the organization-local `date` at which a
    /// booking of `service_ids` (one slot when empty) for `staff_id`
    /// would be accepted.
    pub async fn available(
        &self,
        organization_id: Uuid,
        date: NaiveDate,
        service_ids: &[Uuid],
        staff_id: Option<Uuid>,
    ) -> SlotwiseResult<Vec<DateTime<Utc>>> {
        let settings = self.hours.settings(organization_id).await?;
        let schedule = self.hours.schedule(organization_id).await?;

        let duration_minutes = if service_ids.is_empty() {
            i64::from(settings.slot_minutes)
        } else {
            self.catalog
                .resolve_services(organization_id, service_ids)
                .await?
                .iter()
                .map(|s| i64::from(s.duration_minutes))
                .sum()
        };
        if let Some(staff_id) = staff_id {
            self.catalog.resolve_staff(organization_id, staff_id).await?;
        }

        let candidates = candidate_starts(
            &schedule,
            &settings,
            date,
            duration_minutes,
            self.clock.now(),
        )?;
        if candidates.is_empty() {
            return Ok(candidates);
        }
        if staff_id.is_some() && settings.allow_overlap_per_staff {
            return Ok(candidates);
        }

        let day = schedule
            .open_interval(date)?
            .ok_or_else(|| SlotwiseError::Internal("open interval vanished".into()))?;
        let busy: Vec<TimeRange> = self
            .bookings
            .overlaps(organization_id, staff_id, day, None)
            .await?
            .iter()
            .map(|b| b.range())
            .collect();

        let slots = drop_busy(candidates, duration_minutes, &busy);
        debug!(
            organization_id = %organization_id,
            date = %date,
            staff_id = ?staff_id,
            busy = busy.len(),
            available = slots.len(),
            "Computed available slots"
        );
        Ok(slots)
    }
}
