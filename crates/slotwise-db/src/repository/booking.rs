//! SurrealDB implementation of [`BookingRepository`].
//!
//! Writes that can create or move an interval on a staff member's
//! calendar run as one transaction that starts by upserting the
//! `booking_lock` row for `(organization, staff)`. Two such transactions
//! on the same partition write the same key, so the engine aborts one of
//! them with a retryable conflict. The overlap re-check runs after the
//! lock inside the same transaction and aborts with a
//! `booking_conflict:<id>` marker.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::booking::{
    Booking, BookingChanges, BookingFilter, BookingLine, BookingStatus, CustomerRef, NewBooking,
};
use slotwise_core::models::customer::Customer;
use slotwise_core::models::money;
use slotwise_core::models::staff::Staff;
use slotwise_core::models::vehicle::Vehicle;
use slotwise_core::repository::{BookingRepository, PaginatedResult, Pagination};
use slotwise_core::time::TimeRange;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::customer::{self, CustomerRowWithId};
use super::staff::StaffRowWithId;
use super::vehicle::VehicleRowWithId;
use super::{CountRow, TERMINAL_STATUSES, parse_opt_uuid, parse_uuid};
use crate::error::{BOOKING_CONFLICT, BOOKING_MISSING, BOOKING_STALE, DbError};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct BookingRowWithId {
    record_id: String,
    organization_id: String,
    customer_id: String,
    staff_id: Option<String>,
    vehicle_id: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    total_price_cents: i64,
    notes: Option<String>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct BookingLineRow {
    booking_id: String,
    service_id: String,
    position: u32,
    service_name: String,
    unit_price_cents: i64,
    duration_minutes: u32,
}

impl BookingLineRow {
    fn try_into_line(self) -> Result<(String, BookingLine), DbError> {
        let line = BookingLine {
            service_id: parse_uuid(&self.service_id, "line service")?,
            position: self.position,
            service_name: self.service_name,
            unit_price: money::from_cents(self.unit_price_cents),
            duration_minutes: self.duration_minutes,
        };
        Ok((self.booking_id, line))
    }
}

/// Referenced entities loaded alongside a page of bookings.
#[derive(Default)]
struct Related {
    lines: HashMap<String, Vec<BookingLine>>,
    customers: HashMap<Uuid, Customer>,
    staff: HashMap<Uuid, Staff>,
    vehicles: HashMap<Uuid, Vehicle>,
}

impl BookingRowWithId {
    fn try_into_booking(self, related: &mut Related) -> Result<Booking, DbError> {
        let customer_id = parse_uuid(&self.customer_id, "booking customer")?;
        let staff_id = parse_opt_uuid(self.staff_id.as_deref(), "booking staff")?;
        let vehicle_id = parse_opt_uuid(self.vehicle_id.as_deref(), "booking vehicle")?;
        let status = self
            .status
            .parse::<BookingStatus>()
            .map_err(|e| DbError::decode("booking status", e))?;

        Ok(Booking {
            services: related.lines.remove(&self.record_id).unwrap_or_default(),
            id: parse_uuid(&self.record_id, "booking id")?,
            organization_id: parse_uuid(&self.organization_id, "booking organization")?,
            customer_id,
            staff_id,
            vehicle_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status,
            total_price: money::from_cents(self.total_price_cents),
            notes: self.notes,
            created_by: parse_opt_uuid(self.created_by.as_deref(), "booking creator")?,
            customer: related.customers.get(&customer_id).cloned(),
            staff: staff_id.and_then(|id| related.staff.get(&id).cloned()),
            vehicle: vehicle_id.and_then(|id| related.vehicles.get(&id).cloned()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Statements every guarded write runs first: take the partition lock,
/// then abort if a live booking of the same staff member intersects the
/// new interval.
fn overlap_guard() -> String {
    format!(
        "UPSERT type::record('booking_lock', $lock_key) SET \
             organization_id = $organization_id, \
             staff_id = $staff_id, \
             acquired_at = time::now(); \
         LET $clash = (SELECT meta::id(id) AS record_id, start_time FROM booking \
             WHERE organization_id = $organization_id \
             AND staff_id = $staff_id \
             AND deleted_at IS NONE \
             AND status NOTINSIDE {TERMINAL_STATUSES} \
             AND start_time < $end_time AND end_time > $start_time \
             AND meta::id(id) != $exclude_id \
             ORDER BY start_time ASC LIMIT 1); \
         IF array::len($clash) > 0 {{ \
             THROW string::concat('{BOOKING_CONFLICT}:', $clash[0].record_id); \
         }}; "
    )
}

/// Statements that abort when the booking is gone or its status moved
/// away from `$expected_status`.
fn status_guard(check_stale: bool) -> String {
    let mut sql = format!(
        "LET $current = (SELECT status FROM type::record('booking', $id) \
             WHERE organization_id = $organization_id AND deleted_at IS NONE); \
         IF array::len($current) == 0 {{ \
             THROW string::concat('{BOOKING_MISSING}:', $id); \
         }}; "
    );
    if check_stale {
        sql.push_str(&format!(
            "IF $current[0].status != $expected_status {{ THROW '{BOOKING_STALE}'; }}; "
        ));
    }
    sql
}

const INSERT_LINES: &str = "\
    FOR $line IN $lines { \
        CREATE booking_line SET \
        organization_id = $organization_id, \
        booking_id = $id, \
        service_id = $line.service_id, \
        position = $line.position, \
        service_name = $line.service_name, \
        unit_price_cents = $line.unit_price_cents, \
        duration_minutes = $line.duration_minutes; \
    }; ";

/// Line snapshots as a bindable array, with the total in cents.
fn encode_lines(lines: &[BookingLine], range: &TimeRange) -> SlotwiseResult<(serde_json::Value, i64)> {
    if lines.is_empty() {
        return Err(SlotwiseError::invalid("a booking needs at least one service"));
    }
    let minutes: i64 = lines.iter().map(|l| i64::from(l.duration_minutes)).sum();
    if minutes != range.minutes() {
        return Err(SlotwiseError::invalid(format!(
            "booking spans {} minutes but its services take {minutes}",
            range.minutes()
        )));
    }

    let mut total = 0i64;
    let mut encoded = Vec::with_capacity(lines.len());
    for line in lines {
        let cents = money::to_cents(line.unit_price).map_err(SlotwiseError::invalid)?;
        total += cents;
        encoded.push(serde_json::json!({
            "service_id": line.service_id.to_string(),
            "position": line.position,
            "service_name": line.service_name,
            "unit_price_cents": cents,
            "duration_minutes": line.duration_minutes,
        }));
    }
    Ok((serde_json::Value::Array(encoded), total))
}

fn lock_key(organization_id: Uuid, staff_id: Uuid) -> String {
    format!("{organization_id}:{staff_id}")
}

/// Inline customer fields resolved for a write, and the id the booking
/// will reference.
struct CustomerWrite {
    customer_id: Uuid,
    new: Option<slotwise_core::models::customer::NewCustomer>,
}

fn customer_write(customer: &CustomerRef) -> SlotwiseResult<CustomerWrite> {
    match customer {
        CustomerRef::Existing(id) => Ok(CustomerWrite {
            customer_id: *id,
            new: None,
        }),
        CustomerRef::New(details) => Ok(CustomerWrite {
            customer_id: Uuid::new_v4(),
            new: Some(customer::prepare(details)?),
        }),
    }
}

/// SurrealDB implementation of the Booking repository.
#[derive(Clone)]
pub struct SurrealBookingRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealBookingRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Load lines and referenced entities for `rows` and assemble them.
    async fn hydrate(
        &self,
        organization_id: Uuid,
        rows: Vec<BookingRowWithId>,
    ) -> SlotwiseResult<Vec<Booking>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let booking_ids: Vec<&str> = rows.iter().map(|r| r.record_id.as_str()).collect();
        let customer_ids: Vec<&str> = rows.iter().map(|r| r.customer_id.as_str()).collect();
        let staff_ids: Vec<&str> = rows.iter().filter_map(|r| r.staff_id.as_deref()).collect();
        let vehicle_ids: Vec<&str> = rows.iter().filter_map(|r| r.vehicle_id.as_deref()).collect();

        let mut result = self
            .db
            .query(
                "SELECT booking_id, service_id, position, service_name, \
                 unit_price_cents, duration_minutes FROM booking_line \
                 WHERE organization_id = $organization_id \
                 AND booking_id INSIDE $booking_ids \
                 ORDER BY position ASC; \
                 SELECT meta::id(id) AS record_id, * FROM customer \
                 WHERE organization_id = $organization_id \
                 AND meta::id(id) INSIDE $customer_ids; \
                 SELECT meta::id(id) AS record_id, * FROM staff \
                 WHERE organization_id = $organization_id \
                 AND meta::id(id) INSIDE $staff_ids; \
                 SELECT meta::id(id) AS record_id, * FROM vehicle \
                 WHERE organization_id = $organization_id \
                 AND meta::id(id) INSIDE $vehicle_ids;",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("booking_ids", serde_json::json!(booking_ids)))
            .bind(("customer_ids", serde_json::json!(customer_ids)))
            .bind(("staff_ids", serde_json::json!(staff_ids)))
            .bind(("vehicle_ids", serde_json::json!(vehicle_ids)))
            .await
            .map_err(DbError::from)?;

        let line_rows: Vec<BookingLineRow> = result.take(0).map_err(DbError::from)?;
        let customer_rows: Vec<CustomerRowWithId> = result.take(1).map_err(DbError::from)?;
        let staff_rows: Vec<StaffRowWithId> = result.take(2).map_err(DbError::from)?;
        let vehicle_rows: Vec<VehicleRowWithId> = result.take(3).map_err(DbError::from)?;

        let mut related = Related::default();
        for row in line_rows {
            let (booking_id, line) = row.try_into_line()?;
            related.lines.entry(booking_id).or_default().push(line);
        }
        for row in customer_rows {
            let c = row.try_into_customer()?;
            related.customers.insert(c.id, c);
        }
        for row in staff_rows {
            let s = row.try_into_staff()?;
            related.staff.insert(s.id, s);
        }
        for row in vehicle_rows {
            let v = row.try_into_vehicle()?;
            related.vehicles.insert(v.id, v);
        }

        let bookings = rows
            .into_iter()
            .map(|row| row.try_into_booking(&mut related))
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(bookings)
    }
}

impl<C: Connection> BookingRepository for SurrealBookingRepository<C> {
    async fn insert(&self, input: NewBooking) -> SlotwiseResult<Booking> {
        let (lines, total_cents) = encode_lines(&input.lines, &input.range)?;
        let customer = customer_write(&input.customer)?;
        let guard = match (input.check_overlap, input.staff_id) {
            (true, Some(_)) => overlap_guard(),
            _ => String::new(),
        };

        let id = Uuid::new_v4();
        let query = format!(
            "BEGIN TRANSACTION; \
             {guard}\
             {create_customer}\
             CREATE type::record('booking', $id) SET \
                 organization_id = $organization_id, \
                 customer_id = $customer_id, \
                 staff_id = $staff_id, \
                 vehicle_id = $vehicle_id, \
                 start_time = $start_time, \
                 end_time = $end_time, \
                 status = $status, \
                 total_price_cents = $total_price_cents, \
                 notes = $notes, \
                 created_by = $created_by; \
             {INSERT_LINES}\
             COMMIT TRANSACTION;",
            create_customer = if customer.new.is_some() {
                customer::CREATE_CUSTOMER
            } else {
                ""
            },
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("organization_id", input.organization_id.to_string()))
            .bind(("customer_id", customer.customer_id.to_string()))
            .bind(("staff_id", input.staff_id.map(|s| s.to_string())))
            .bind(("vehicle_id", input.vehicle_id.map(|v| v.to_string())))
            .bind(("start_time", input.range.start))
            .bind(("end_time", input.range.end))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("total_price_cents", total_cents))
            .bind(("notes", input.notes))
            .bind(("created_by", input.created_by.map(|u| u.to_string())))
            .bind(("lines", lines))
            .bind(("exclude_id", None::<String>));
        if let Some(staff_id) = input.staff_id {
            builder = builder.bind(("lock_key", lock_key(input.organization_id, staff_id)));
        }
        if let Some(details) = customer.new {
            builder = builder
                .bind(("first_name", details.first_name))
                .bind(("last_name", details.last_name))
                .bind(("phone", details.phone))
                .bind((
                    "email_key",
                    customer::email_key(customer.customer_id, details.email.as_deref()),
                ))
                .bind(("email", details.email));
        }
        run_checked!(builder);

        info!(
            organization_id = %input.organization_id,
            booking_id = %id,
            staff_id = ?input.staff_id,
            "Booking inserted"
        );
        self.get(input.organization_id, id).await
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        changes: BookingChanges,
    ) -> SlotwiseResult<Booking> {
        let (lines, total_cents) = encode_lines(&changes.lines, &changes.range)?;
        let customer = customer_write(&changes.customer)?;
        let guard = match (changes.check_overlap, changes.staff_id) {
            (true, Some(_)) => overlap_guard(),
            _ => String::new(),
        };

        let query = format!(
            "BEGIN TRANSACTION; \
             {status_guard}\
             {guard}\
             {create_customer}\
             UPDATE type::record('booking', $id) SET \
                 customer_id = $customer_id, \
                 staff_id = $staff_id, \
                 vehicle_id = $vehicle_id, \
                 start_time = $start_time, \
                 end_time = $end_time, \
                 status = $status, \
                 total_price_cents = $total_price_cents, \
                 notes = $notes, \
                 updated_at = time::now() \
                 WHERE organization_id = $organization_id; \
             DELETE booking_line WHERE organization_id = $organization_id \
                 AND booking_id = $id; \
             {INSERT_LINES}\
             COMMIT TRANSACTION;",
            status_guard = status_guard(true),
            create_customer = if customer.new.is_some() {
                customer::CREATE_CUSTOMER
            } else {
                ""
            },
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("organization_id", organization_id.to_string()))
            .bind(("expected_status", changes.expected_status.as_str().to_string()))
            .bind(("customer_id", customer.customer_id.to_string()))
            .bind(("staff_id", changes.staff_id.map(|s| s.to_string())))
            .bind(("vehicle_id", changes.vehicle_id.map(|v| v.to_string())))
            .bind(("start_time", changes.range.start))
            .bind(("end_time", changes.range.end))
            .bind(("status", changes.status.as_str().to_string()))
            .bind(("total_price_cents", total_cents))
            .bind(("notes", changes.notes))
            .bind(("lines", lines))
            .bind(("exclude_id", Some(id.to_string())));
        if let Some(staff_id) = changes.staff_id {
            builder = builder.bind(("lock_key", lock_key(organization_id, staff_id)));
        }
        if let Some(details) = customer.new {
            builder = builder
                .bind(("first_name", details.first_name))
                .bind(("last_name", details.last_name))
                .bind(("phone", details.phone))
                .bind((
                    "email_key",
                    customer::email_key(customer.customer_id, details.email.as_deref()),
                ))
                .bind(("email", details.email));
        }
        run_checked!(builder);

        info!(organization_id = %organization_id, booking_id = %id, "Booking updated");
        self.get(organization_id, id).await
    }

    async fn set_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        status: BookingStatus,
    ) -> SlotwiseResult<Booking> {
        let current = self.get(organization_id, id).await?;
        if !current.status.can_transition_to(status) {
            return Err(SlotwiseError::InvalidTransition {
                from: current.status,
                to: status.to_string(),
            });
        }

        let query = format!(
            "BEGIN TRANSACTION; \
             {status_guard}\
             UPDATE type::record('booking', $id) SET \
                 status = $status, updated_at = time::now() \
                 WHERE organization_id = $organization_id; \
             COMMIT TRANSACTION;",
            status_guard = status_guard(true),
        );
        run_checked!(
            self.db
                .query(&query)
                .bind(("id", id.to_string()))
                .bind(("organization_id", organization_id.to_string()))
                .bind(("expected_status", current.status.as_str().to_string()))
                .bind(("status", status.as_str().to_string()))
        );

        info!(
            organization_id = %organization_id,
            booking_id = %id,
            from = %current.status,
            to = %status,
            "Booking status changed"
        );
        self.get(organization_id, id).await
    }

    async fn soft_delete(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<()> {
        let query = format!(
            "BEGIN TRANSACTION; \
             {status_guard}\
             UPDATE type::record('booking', $id) SET \
                 deleted_at = time::now(), updated_at = time::now() \
                 WHERE organization_id = $organization_id; \
             COMMIT TRANSACTION;",
            status_guard = status_guard(false),
        );
        run_checked!(
            self.db
                .query(&query)
                .bind(("id", id.to_string()))
                .bind(("organization_id", organization_id.to_string()))
        );

        info!(organization_id = %organization_id, booking_id = %id, "Booking soft-deleted");
        Ok(())
    }

    async fn get(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Booking> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('booking', $id) \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BookingRowWithId> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "booking".into(),
                id: id_str,
            }
            .into());
        }

        self.hydrate(organization_id, rows)
            .await?
            .pop()
            .ok_or_else(|| SlotwiseError::not_found("booking", id))
    }

    async fn list(
        &self,
        organization_id: Uuid,
        filter: BookingFilter,
        pagination: Pagination,
    ) -> SlotwiseResult<PaginatedResult<Booking>> {
        let mut conditions = vec![
            "organization_id = $organization_id",
            "deleted_at IS NONE",
        ];
        if filter.range.is_some() {
            conditions.push("start_time < $range_end AND end_time > $range_start");
        }
        if filter.status.is_some() {
            conditions.push("status = $status");
        }
        if filter.staff_id.is_some() {
            conditions.push("staff_id = $staff_id");
        }
        if filter.customer_id.is_some() {
            conditions.push("customer_id = $customer_id");
        }
        if filter.service_id.is_some() {
            conditions.push(
                "meta::id(id) INSIDE (SELECT VALUE booking_id FROM booking_line \
                 WHERE organization_id = $organization_id \
                 AND service_id = $service_id)",
            );
        }
        let text = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        if text.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(notes ?? ''), $text) \
                 OR customer_id INSIDE (SELECT VALUE meta::id(id) FROM customer \
                 WHERE organization_id = $organization_id \
                 AND string::contains(string::lowercase(\
                 string::concat(first_name, ' ', last_name)), $text)))",
            );
        }
        let where_clause = conditions.join(" AND ");

        let count_query =
            format!("SELECT count() AS total FROM booking WHERE {where_clause} GROUP ALL");
        let items_query = format!(
            "SELECT meta::id(id) AS record_id, * FROM booking WHERE {where_clause} \
             ORDER BY start_time ASC, record_id ASC \
             LIMIT $limit START $offset"
        );

        let bind = |query: &str| {
            let mut builder = self
                .db
                .query(query.to_string())
                .bind(("organization_id", organization_id.to_string()));
            if let Some(range) = filter.range {
                builder = builder
                    .bind(("range_start", range.start))
                    .bind(("range_end", range.end));
            }
            if let Some(status) = filter.status {
                builder = builder.bind(("status", status.as_str().to_string()));
            }
            if let Some(staff_id) = filter.staff_id {
                builder = builder.bind(("staff_id", staff_id.to_string()));
            }
            if let Some(customer_id) = filter.customer_id {
                builder = builder.bind(("customer_id", customer_id.to_string()));
            }
            if let Some(service_id) = filter.service_id {
                builder = builder.bind(("service_id", service_id.to_string()));
            }
            if let Some(ref text) = text {
                builder = builder.bind(("text", text.clone()));
            }
            builder
        };

        let mut count_result = bind(&count_query).await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = bind(&items_query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<BookingRowWithId> = result.take(0).map_err(DbError::from)?;

        debug!(
            organization_id = %organization_id,
            total,
            returned = rows.len(),
            "Listed bookings"
        );

        Ok(PaginatedResult {
            items: self.hydrate(organization_id, rows).await?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn overlaps(
        &self,
        organization_id: Uuid,
        staff_id: Option<Uuid>,
        range: TimeRange,
        exclude_booking_id: Option<Uuid>,
    ) -> SlotwiseResult<Vec<Booking>> {
        let staff_clause = if staff_id.is_some() {
            "AND staff_id = $staff_id "
        } else {
            ""
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM booking \
             WHERE organization_id = $organization_id \
             {staff_clause}\
             AND deleted_at IS NONE \
             AND status NOTINSIDE {TERMINAL_STATUSES} \
             AND start_time < $end_time AND end_time > $start_time \
             AND meta::id(id) != $exclude_id \
             ORDER BY start_time ASC, record_id ASC"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("organization_id", organization_id.to_string()))
            .bind(("staff_id", staff_id.map(|s| s.to_string())))
            .bind(("start_time", range.start))
            .bind(("end_time", range.end))
            .bind(("exclude_id", exclude_booking_id.map(|b| b.to_string())))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BookingRowWithId> = result.take(0).map_err(DbError::from)?;
        self.hydrate(organization_id, rows).await
    }
}
