//! Booking domain model, status state machine, and the inputs accepted
//! by the booking store and orchestrator.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::customer::{Customer, NewCustomer};
use super::staff::Staff;
use super::vehicle::Vehicle;
use crate::time::TimeRange;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Scheduled,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    /// Statuses excluded from overlap checks.
    pub const TERMINAL: [BookingStatus; 3] = [
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    /// Statuses reachable from `self` in one step.
    pub fn successors(&self) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match self {
            Scheduled => &[Confirmed, Cancelled, NoShow],
            Confirmed => &[InProgress, Cancelled, NoShow],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown booking status: {s}"))
    }
}

/// One service on a booking, with the price and duration captured when
/// the booking was written. Ordered by `position`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingLine {
    pub service_id: Uuid,
    pub position: u32,
    pub service_name: String,
    pub unit_price: Decimal,
    pub duration_minutes: u32,
}

/// A booking hydrated with its lines and referenced entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub customer_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub services: Vec<BookingLine>,
    pub customer: Option<Customer>,
    pub staff: Option<Staff>,
    pub vehicle: Option<Vehicle>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Who the booking is for: an existing customer or one created inline in
/// the same transaction as the booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    Existing(Uuid),
    New(NewCustomer),
}

/// Booking request as accepted by create and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingInput {
    pub customer_id: Option<Uuid>,
    pub new_customer: Option<NewCustomer>,
    pub service_ids: Vec<Uuid>,
    pub staff_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub status: Option<BookingStatus>,
    pub notes: Option<String>,
}

/// A fully validated booking ready to be written by the store.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub organization_id: Uuid,
    pub customer: CustomerRef,
    pub staff_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub range: TimeRange,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub lines: Vec<BookingLine>,
    /// Run the staff overlap check under the advisory lock.
    pub check_overlap: bool,
    pub created_by: Option<Uuid>,
}

/// Replacement values for a full update of an existing booking.
#[derive(Debug, Clone)]
pub struct BookingChanges {
    /// Status the caller validated against; a concurrent change aborts
    /// the write.
    pub expected_status: BookingStatus,
    pub customer: CustomerRef,
    pub staff_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub range: TimeRange,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub lines: Vec<BookingLine>,
    pub check_overlap: bool,
}

/// Typed filter for booking listings; every field narrows the result.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    /// Bookings whose interval intersects this range.
    pub range: Option<TimeRange>,
    pub status: Option<BookingStatus>,
    pub staff_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    /// Case-insensitive substring of customer full name or notes.
    pub text: Option<String>,
}

/// Listing query as received from callers (organization-local dates,
/// 1-based page numbers).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<BookingStatus>,
    pub staff_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<u64>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u64>,
}

/// Page of results in the shape returned to API callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_count: u64) -> Self {
        Self {
            items,
            page,
            page_size,
            total_count,
            total_pages: total_count.div_ceil(page_size.max(1)),
        }
    }
}
