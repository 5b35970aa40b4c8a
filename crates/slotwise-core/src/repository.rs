//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories take
//! an `organization_id` parameter and must add it to every query they
//! issue; an entity belonging to another organization is reported as
//! `NotFound`.

use uuid::Uuid;

use crate::error::SlotwiseResult;
use crate::models::{
    booking::{Booking, BookingChanges, BookingFilter, BookingStatus, NewBooking},
    business_hours::{BookingSettings, WeekdayHours, WeeklySchedule},
    customer::{CreateCustomer, Customer, UpdateCustomer},
    organization::{CreateOrganization, Organization, UpdateOrganization},
    service::{CreateService, Service, UpdateService},
    staff::{CreateStaff, Staff, UpdateStaff},
    vehicle::{CreateVehicle, Vehicle},
};
use crate::time::TimeRange;

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

impl Pagination {
    /// Convert a 1-based page number and page size into offset/limit.
    pub fn from_page(page: u64, page_size: u64) -> Self {
        Self {
            offset: page.saturating_sub(1) * page_size,
            limit: page_size,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Organization (tenant root)
// ---------------------------------------------------------------------------

pub trait OrganizationRepository: Send + Sync {
    /// Creates the organization together with seven closed business-hours
    /// rows and a settings row initialised from `settings`.
    fn create(
        &self,
        input: CreateOrganization,
        settings: BookingSettings,
    ) -> impl Future<Output = SlotwiseResult<Organization>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = SlotwiseResult<Organization>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrganization,
    ) -> impl Future<Output = SlotwiseResult<Organization>> + Send;
}

// ---------------------------------------------------------------------------
// Business hours
// ---------------------------------------------------------------------------

pub trait BusinessHoursRepository: Send + Sync {
    /// All configured weekdays, ordered by weekday.
    fn get_week(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Vec<WeekdayHours>>> + Send;

    /// Replace the organization's weekly hours.
    fn set_week(
        &self,
        organization_id: Uuid,
        week: Vec<WeekdayHours>,
    ) -> impl Future<Output = SlotwiseResult<Vec<WeekdayHours>>> + Send;

    /// The week bound to the organization's UTC offset.
    fn schedule(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<WeeklySchedule>> + Send;

    fn settings(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<BookingSettings>> + Send;

    fn update_settings(
        &self,
        organization_id: Uuid,
        settings: BookingSettings,
    ) -> impl Future<Output = SlotwiseResult<BookingSettings>> + Send;

    /// True iff `range` lies within one open weekday interval.
    fn contains(
        &self,
        organization_id: Uuid,
        range: TimeRange,
    ) -> impl Future<Output = SlotwiseResult<bool>> + Send {
        async move { Ok(self.schedule(organization_id).await?.contains(&range)) }
    }
}

// ---------------------------------------------------------------------------
// Catalog entities (tenant-scoped)
// ---------------------------------------------------------------------------

pub trait CustomerRepository: Send + Sync {
    fn create(&self, input: CreateCustomer)
    -> impl Future<Output = SlotwiseResult<Customer>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Customer>> + Send;
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateCustomer,
    ) -> impl Future<Output = SlotwiseResult<Customer>> + Send;
}

pub trait VehicleRepository: Send + Sync {
    fn create(&self, input: CreateVehicle) -> impl Future<Output = SlotwiseResult<Vehicle>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Vehicle>> + Send;
}

pub trait ServiceRepository: Send + Sync {
    fn create(&self, input: CreateService) -> impl Future<Output = SlotwiseResult<Service>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Service>> + Send;
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateService,
    ) -> impl Future<Output = SlotwiseResult<Service>> + Send;
    /// Hard delete. Fails with `InUse` while any non-terminal booking
    /// references the service.
    fn delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<()>> + Send;
}

pub trait StaffRepository: Send + Sync {
    fn create(&self, input: CreateStaff) -> impl Future<Output = SlotwiseResult<Staff>> + Send;
    fn get_by_id(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Staff>> + Send;
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateStaff,
    ) -> impl Future<Output = SlotwiseResult<Staff>> + Send;
}

/// Read-only view of the catalog consumed by the booking core.
pub trait Catalog: Send + Sync {
    fn resolve_organization(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Organization>> + Send;

    /// Services in input order. `NotFound` if any id is missing or
    /// belongs to another organization, `Invalid` if any is inactive.
    fn resolve_services(
        &self,
        organization_id: Uuid,
        service_ids: &[Uuid],
    ) -> impl Future<Output = SlotwiseResult<Vec<Service>>> + Send;

    fn resolve_customer(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Customer>> + Send;

    fn resolve_staff(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Staff>> + Send;

    fn resolve_vehicle(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Vehicle>> + Send;
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

pub trait BookingRepository: Send + Sync {
    /// Write the booking and its lines atomically. When
    /// `check_overlap` is set the staff overlap check runs inside the same
    /// transaction under the `(organization, staff)` advisory lock.
    fn insert(&self, input: NewBooking) -> impl Future<Output = SlotwiseResult<Booking>> + Send;

    /// Replace a booking's times, references and lines atomically.
    fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        changes: BookingChanges,
    ) -> impl Future<Output = SlotwiseResult<Booking>> + Send;

    /// Move a booking along the status state machine.
    fn set_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: BookingStatus,
    ) -> impl Future<Output = SlotwiseResult<Booking>> + Send;

    fn soft_delete(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<()>> + Send;

    fn get(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = SlotwiseResult<Booking>> + Send;

    /// Ordered by `start_time ASC, id ASC`.
    fn list(
        &self,
        organization_id: Uuid,
        filter: BookingFilter,
        pagination: Pagination,
    ) -> impl Future<Output = SlotwiseResult<PaginatedResult<Booking>>> + Send;

    /// Non-terminal, non-deleted bookings of the organization that
    /// intersect `range`, restricted to `staff_id` when given.
    fn overlaps(
        &self,
        organization_id: Uuid,
        staff_id: Option<Uuid>,
        range: TimeRange,
        exclude_booking_id: Option<Uuid>,
    ) -> impl Future<Output = SlotwiseResult<Vec<Booking>>> + Send;
}
