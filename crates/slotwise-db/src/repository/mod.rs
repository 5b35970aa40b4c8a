//! SurrealDB repository implementations.

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Await a query and fail with the most specific statement error.
///
/// Every statement of a failed transaction reports an error, and only
/// the one that failed carries the `THROW` marker, so all of them are
/// inspected rather than just the first.
macro_rules! run_checked {
    ($query:expr) => {{
        let mut response = $query.await.map_err(DbError::from)?;
        if let Some(err) = DbError::from_statement_errors(response.take_errors().into_values()) {
            return Err(err.into());
        }
        response
    }};
}

mod booking;
mod business_hours;
mod catalog;
mod customer;
mod organization;
mod service;
mod staff;
mod vehicle;

pub use booking::SurrealBookingRepository;
pub use business_hours::SurrealBusinessHoursRepository;
pub use catalog::SurrealCatalog;
pub use customer::SurrealCustomerRepository;
pub use organization::SurrealOrganizationRepository;
pub use service::SurrealServiceRepository;
pub use staff::SurrealStaffRepository;
pub use vehicle::SurrealVehicleRepository;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(what, e))
}

fn parse_opt_uuid(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| parse_uuid(s, what)).transpose()
}

/// SurrealQL array literal of the terminal booking statuses.
const TERMINAL_STATUSES: &str = "['completed', 'cancelled', 'no_show']";
