//! Booking service: create, update, status, listing, deletion and slot
//! lookup under a tenant context.
//!
//! Every operation runs under the configured deadline. Writes that lose
//! a serialization race are retried with jittered backoff; the overlap
//! check is repeated inside the write transaction by the store.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use slotwise_auth::context::{Operation, TenantContext};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::booking::{
    Booking, BookingChanges, BookingFilter, BookingInput, BookingLine, BookingStatus, CustomerRef,
    ListQuery, NewBooking, Page,
};
use slotwise_core::models::business_hours::{BookingSettings, WeeklySchedule};
use slotwise_core::models::organization::{Organization, OrganizationStatus};
use slotwise_core::models::service::Service;
use slotwise_core::repository::{
    BookingRepository, BusinessHoursRepository, Catalog, Pagination,
};
use slotwise_core::time::{TimeRange, local_day};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::BookingConfig;
use crate::retry::{Backoff, retry_serialization};
use crate::slots::SlotEngine;

/// Everything the validation pipeline derived from a booking request.
struct Validated {
    customer: CustomerRef,
    staff_id: Option<Uuid>,
    vehicle_id: Option<Uuid>,
    range: TimeRange,
    status: BookingStatus,
    notes: Option<String>,
    lines: Vec<BookingLine>,
    check_overlap: bool,
}

/// Booking orchestrator.
///
/// Generic over repository implementations so that the booking layer
/// has no dependency on the database crate.
pub struct BookingService<C: Catalog, H: BusinessHoursRepository, B: BookingRepository> {
    catalog: C,
    hours: H,
    bookings: B,
    config: BookingConfig,
    clock: Arc<dyn Clock>,
}

impl<C, H, B> BookingService<C, H, B>
where
    C: Catalog,
    H: BusinessHoursRepository,
    B: BookingRepository,
{
    pub fn new(catalog: C, hours: H, bookings: B, config: BookingConfig) -> Self {
        Self::with_clock(catalog, hours, bookings, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        catalog: C,
        hours: H,
        bookings: B,
        config: BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            hours,
            bookings,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Run `fut` under the operation deadline. On expiry the future is
    /// dropped, which abandons any open transaction.
    async fn deadline<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = SlotwiseResult<T>>,
    ) -> SlotwiseResult<T> {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.operation_timeout.as_millis() as u64,
                    "Booking operation timed out"
                );
                Err(SlotwiseError::Timeout)
            }
        }
    }

    fn backoff(&self) -> Backoff {
        Backoff {
            min_ms: self.config.backoff_min_ms,
            max_ms: self.config.backoff_max_ms,
        }
    }

    /// The organization, if it may accept booking writes.
    async fn active_organization(&self, organization_id: Uuid) -> SlotwiseResult<Organization> {
        let organization = self.catalog.resolve_organization(organization_id).await?;
        if organization.status != OrganizationStatus::Active {
            return Err(SlotwiseError::forbidden(format!(
                "organization {organization_id} is not active"
            )));
        }
        Ok(organization)
    }

    // -----------------------------------------------------------------------
    // Create / update
    // -----------------------------------------------------------------------

    pub async fn create(&self, ctx: &TenantContext, input: BookingInput) -> SlotwiseResult<Booking> {
        self.deadline("create", self.create_inner(ctx, input)).await
    }

    async fn create_inner(&self, ctx: &TenantContext, input: BookingInput) -> SlotwiseResult<Booking> {
        ctx.require(Operation::CreateBooking)?;
        let org = ctx.organization_id;
        self.active_organization(org).await?;

        let status = input.status.unwrap_or(BookingStatus::Scheduled);
        if status.is_terminal() {
            return Err(SlotwiseError::invalid(format!(
                "a booking cannot be created as {status}"
            )));
        }

        let settings = self.hours.settings(org).await?;
        let schedule = self.hours.schedule(org).await?;
        let validated = self
            .validate(org, &input, status, &settings, &schedule, None, true)
            .await?;

        let booking = retry_serialization(
            || {
                self.bookings.insert(NewBooking {
                    organization_id: org,
                    customer: validated.customer.clone(),
                    staff_id: validated.staff_id,
                    vehicle_id: validated.vehicle_id,
                    range: validated.range,
                    status: validated.status,
                    notes: validated.notes.clone(),
                    lines: validated.lines.clone(),
                    check_overlap: validated.check_overlap,
                    created_by: Some(ctx.user_id),
                })
            },
            self.config.max_serialization_retries,
            self.backoff(),
        )
        .await?;

        info!(
            organization_id = %org,
            booking_id = %booking.id,
            staff_id = ?booking.staff_id,
            start_time = %booking.start_time,
            "Booking created"
        );
        Ok(booking)
    }

    /// Full update with the same fields as create.
    pub async fn update(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: BookingInput,
    ) -> SlotwiseResult<Booking> {
        self.deadline("update", self.update_inner(ctx, id, input)).await
    }

    async fn update_inner(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: BookingInput,
    ) -> SlotwiseResult<Booking> {
        ctx.require(Operation::UpdateBooking)?;
        let org = ctx.organization_id;
        self.active_organization(org).await?;

        let existing = self.bookings.get(org, id).await?;
        let status = input.status.unwrap_or(existing.status);
        if existing.status.is_terminal() {
            return Err(SlotwiseError::InvalidTransition {
                from: existing.status,
                to: status.to_string(),
            });
        }
        if status != existing.status {
            ctx.require(Operation::ChangeBookingStatus)?;
            if !existing.status.can_transition_to(status) {
                return Err(SlotwiseError::InvalidTransition {
                    from: existing.status,
                    to: status.to_string(),
                });
            }
        }

        let settings = self.hours.settings(org).await?;
        let schedule = self.hours.schedule(org).await?;
        let start_moved = input.start_time != existing.start_time;
        let validated = self
            .validate(org, &input, status, &settings, &schedule, Some(id), start_moved)
            .await?;

        let booking = retry_serialization(
            || {
                self.bookings.update(
                    org,
                    id,
                    BookingChanges {
                        expected_status: existing.status,
                        customer: validated.customer.clone(),
                        staff_id: validated.staff_id,
                        vehicle_id: validated.vehicle_id,
                        range: validated.range,
                        status: validated.status,
                        notes: validated.notes.clone(),
                        lines: validated.lines.clone(),
                        check_overlap: validated.check_overlap,
                    },
                )
            },
            self.config.max_serialization_retries,
            self.backoff(),
        )
        .await?;

        info!(organization_id = %org, booking_id = %id, "Booking updated");
        Ok(booking)
    }

    /// The shared validation pipeline of create and update.
    #[allow(clippy::too_many_arguments)]
    async fn validate(
        &self,
        org: Uuid,
        input: &BookingInput,
        status: BookingStatus,
        settings: &BookingSettings,
        schedule: &WeeklySchedule,
        exclude: Option<Uuid>,
        check_window: bool,
    ) -> SlotwiseResult<Validated> {
        let customer = match (input.customer_id, &input.new_customer) {
            (Some(id), None) => CustomerRef::Existing(id),
            (None, Some(details)) => {
                details.validate().map_err(SlotwiseError::invalid)?;
                CustomerRef::New(details.normalized())
            }
            (Some(_), Some(_)) => {
                return Err(SlotwiseError::invalid(
                    "give either customer_id or new_customer, not both",
                ));
            }
            (None, None) => {
                return Err(SlotwiseError::invalid(
                    "a booking needs customer_id or new_customer",
                ));
            }
        };
        if input.service_ids.is_empty() {
            return Err(SlotwiseError::invalid("a booking needs at least one service"));
        }
        ensure_unique_services(&input.service_ids)?;

        let services = self.catalog.resolve_services(org, &input.service_ids).await?;
        let lines = snapshot_lines(&services);
        let minutes: i64 = lines.iter().map(|l| i64::from(l.duration_minutes)).sum();
        let range = TimeRange::starting_at(input.start_time, minutes)?;

        if check_window {
            self.check_window(settings, input.start_time)?;
        }
        if !schedule.contains(&range) {
            return Err(SlotwiseError::OutsideHours);
        }

        if let CustomerRef::Existing(id) = customer {
            let existing = self.catalog.resolve_customer(org, id).await?;
            if !existing.is_active {
                return Err(SlotwiseError::invalid(format!("customer {id} is inactive")));
            }
        }

        let requires_vehicle = services.iter().any(|s| s.requires_vehicle);
        match input.vehicle_id {
            Some(vehicle_id) => {
                let vehicle = self.catalog.resolve_vehicle(org, vehicle_id).await?;
                let owned = matches!(customer, CustomerRef::Existing(id) if id == vehicle.customer_id);
                if !owned {
                    return Err(SlotwiseError::VehicleMismatch);
                }
                if !vehicle.is_active {
                    return Err(SlotwiseError::invalid(format!(
                        "vehicle {vehicle_id} is inactive"
                    )));
                }
            }
            None if requires_vehicle => return Err(SlotwiseError::VehicleRequired),
            None => {}
        }

        let check_overlap = match input.staff_id {
            Some(staff_id) => {
                let staff = self.catalog.resolve_staff(org, staff_id).await?;
                if !staff.is_active {
                    return Err(SlotwiseError::invalid(format!(
                        "staff member {staff_id} is inactive"
                    )));
                }
                !settings.allow_overlap_per_staff
            }
            None => false,
        };

        if check_overlap {
            let clashes = self
                .bookings
                .overlaps(org, input.staff_id, range, exclude)
                .await?;
            if let Some(first) = clashes.first() {
                return Err(SlotwiseError::Conflict {
                    booking_id: Some(first.id),
                });
            }
        }

        Ok(Validated {
            customer,
            staff_id: input.staff_id,
            vehicle_id: input.vehicle_id,
            range,
            status,
            notes: input.notes.clone(),
            lines,
            check_overlap,
        })
    }

    fn check_window(&self, settings: &BookingSettings, start: DateTime<Utc>) -> SlotwiseResult<()> {
        let now = self.clock.now();
        let earliest = now + Duration::minutes(i64::from(settings.min_lead_minutes));
        let latest = now + Duration::days(i64::from(settings.max_horizon_days));
        if start < earliest {
            return Err(SlotwiseError::OutsideBookingWindow {
                reason: format!(
                    "bookings must start at least {} minutes from now",
                    settings.min_lead_minutes
                ),
            });
        }
        if start > latest {
            return Err(SlotwiseError::OutsideBookingWindow {
                reason: format!(
                    "bookings may start at most {} days from now",
                    settings.max_horizon_days
                ),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Status, read, delete
    // -----------------------------------------------------------------------

    pub async fn set_status(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        status: BookingStatus,
    ) -> SlotwiseResult<Booking> {
        self.deadline("set_status", async {
            ctx.require(Operation::ChangeBookingStatus)?;
            let org = ctx.organization_id;
            self.active_organization(org).await?;

            retry_serialization(
                || self.bookings.set_status(org, id, status),
                self.config.max_serialization_retries,
                self.backoff(),
            )
            .await
        })
        .await
    }

    pub async fn get(&self, ctx: &TenantContext, id: Uuid) -> SlotwiseResult<Booking> {
        self.deadline("get", async {
            ctx.require(Operation::ViewBookings)?;
            self.bookings.get(ctx.organization_id, id).await
        })
        .await
    }

    pub async fn list(&self, ctx: &TenantContext, query: ListQuery) -> SlotwiseResult<Page<Booking>> {
        self.deadline("list", self.list_inner(ctx, query)).await
    }

    async fn list_inner(&self, ctx: &TenantContext, query: ListQuery) -> SlotwiseResult<Page<Booking>> {
        ctx.require(Operation::ViewBookings)?;
        let org = ctx.organization_id;

        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(SlotwiseError::invalid("page must be at least 1"));
        }
        let page_size = query.page_size.unwrap_or(self.config.default_page_size);
        if page_size == 0 || page_size > self.config.max_page_size {
            return Err(SlotwiseError::invalid(format!(
                "pageSize must be between 1 and {}",
                self.config.max_page_size
            )));
        }

        let range = match (query.date_from, query.date_to) {
            (None, None) => None,
            (from, to) => {
                let schedule = self.hours.schedule(org).await?;
                Some(date_range(schedule, from, to)?)
            }
        };

        let filter = BookingFilter {
            range,
            status: query.status,
            staff_id: query.staff_id,
            customer_id: query.customer_id,
            service_id: query.service_id,
            text: query.q,
        };
        let result = self
            .bookings
            .list(org, filter, Pagination::from_page(page, page_size))
            .await?;

        Ok(Page::new(result.items, page, page_size, result.total))
    }

    /// Soft delete. Non-terminal bookings need a status change first
    /// unless the caller is an admin.
    pub async fn delete(&self, ctx: &TenantContext, id: Uuid) -> SlotwiseResult<()> {
        self.deadline("delete", async {
            ctx.require(Operation::DeleteBooking)?;
            let org = ctx.organization_id;
            self.active_organization(org).await?;

            let existing = self.bookings.get(org, id).await?;
            if !existing.status.is_terminal() && !ctx.may_delete_live_bookings() {
                return Err(SlotwiseError::InvalidTransition {
                    from: existing.status,
                    to: "deleted".into(),
                });
            }
            self.bookings.soft_delete(org, id).await?;

            info!(
                organization_id = %org,
                booking_id = %id,
                status = %existing.status,
                deleted_by = %ctx.user_id,
                "Booking deleted"
            );
            Ok(())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    pub async fn available_slots(
        &self,
        ctx: &TenantContext,
        date: NaiveDate,
        service_ids: &[Uuid],
        staff_id: Option<Uuid>,
    ) -> SlotwiseResult<Vec<DateTime<Utc>>> {
        self.deadline("available_slots", async {
            ctx.require(Operation::ViewBookings)?;
            ensure_unique_services(service_ids)?;
            SlotEngine::new(&self.catalog, &self.hours, &self.bookings, self.clock.as_ref())
                .available(ctx.organization_id, date, service_ids, staff_id)
                .await
        })
        .await
    }
}

fn ensure_unique_services(service_ids: &[Uuid]) -> SlotwiseResult<()> {
    let mut seen = HashSet::new();
    if let Some(dup) = service_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(SlotwiseError::invalid(format!("service {dup} listed twice")));
    }
    Ok(())
}

/// Price and duration snapshots for the booking's lines, in request order.
fn snapshot_lines(services: &[Service]) -> Vec<BookingLine> {
    services
        .iter()
        .enumerate()
        .map(|(position, s)| BookingLine {
            service_id: s.id,
            position: position as u32,
            service_name: s.name.clone(),
            unit_price: s.price,
            duration_minutes: s.duration_minutes,
        })
        .collect()
}

/// Span used for the missing side of a half-open date filter.
const OPEN_ENDED_DAYS: i64 = 100 * 366;

/// UTC range covering the organization-local dates `from..=to`.
fn date_range(
    schedule: WeeklySchedule,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> SlotwiseResult<TimeRange> {
    let offset = schedule.offset();
    let start = from.map(|d| local_day(offset, d)).transpose()?.map(|r| r.start);
    let end = to.map(|d| local_day(offset, d)).transpose()?.map(|r| r.end);
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => {
            let end = start
                .checked_add_signed(Duration::days(OPEN_ENDED_DAYS))
                .ok_or_else(|| SlotwiseError::invalid("date_from is too far in the future"))?;
            (start, end)
        }
        (None, Some(end)) => (DateTime::<Utc>::UNIX_EPOCH, end),
        (None, None) => {
            return Err(SlotwiseError::invalid("date range needs date_from or date_to"));
        }
    };
    TimeRange::new(start, end)
        .map_err(|_| SlotwiseError::invalid("date_from must not be after date_to"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use slotwise_core::time::parse_offset;

    use super::*;

    #[test]
    fn duplicate_services_are_rejected() {
        let a = Uuid::new_v4();
        assert!(ensure_unique_services(&[a, Uuid::new_v4()]).is_ok());
        assert!(matches!(
            ensure_unique_services(&[a, a]),
            Err(SlotwiseError::Invalid { .. })
        ));
    }

    #[test]
    fn date_range_is_inclusive_and_local() {
        let schedule = WeeklySchedule::new(parse_offset("+02:00").unwrap(), &[]);
        let day = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        let range = date_range(schedule, Some(day), Some(day)).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2030, 1, 6, 22, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2030, 1, 7, 22, 0, 0).unwrap());
    }

    #[test]
    fn inverted_date_range_is_invalid() {
        let schedule = WeeklySchedule::new(parse_offset("UTC").unwrap(), &[]);
        let from = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        let to = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
        assert!(date_range(schedule, Some(from), Some(to)).is_err());
    }

    #[test]
    fn extreme_dates_are_invalid() {
        let schedule = || WeeklySchedule::new(parse_offset("UTC").unwrap(), &[]);
        let far = NaiveDate::from_ymd_opt(262_100, 1, 1).unwrap();
        for (from, to) in [
            (None, Some(NaiveDate::MAX)),
            (Some(NaiveDate::MAX), None),
            (Some(far), None),
        ] {
            assert!(matches!(
                date_range(schedule(), from, to),
                Err(SlotwiseError::Invalid { .. })
            ));
        }
    }
}
