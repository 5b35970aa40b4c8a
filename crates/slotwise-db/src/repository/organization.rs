//! SurrealDB implementation of [`OrganizationRepository`].

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::business_hours::BookingSettings;
use slotwise_core::models::organization::{
    CreateOrganization, Organization, OrganizationStatus, UpdateOrganization,
};
use slotwise_core::repository::OrganizationRepository;
use slotwise_core::time::parse_offset;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct OrganizationRowWithId {
    record_id: String,
    name: String,
    timezone: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<OrganizationStatus, DbError> {
    match s {
        "active" => Ok(OrganizationStatus::Active),
        "pending" => Ok(OrganizationStatus::Pending),
        "suspended" => Ok(OrganizationStatus::Suspended),
        other => Err(DbError::decode("organization status", other)),
    }
}

fn status_to_string(s: OrganizationStatus) -> &'static str {
    match s {
        OrganizationStatus::Active => "active",
        OrganizationStatus::Pending => "pending",
        OrganizationStatus::Suspended => "suspended",
    }
}

impl OrganizationRowWithId {
    pub(super) fn try_into_organization(self) -> Result<Organization, DbError> {
        Ok(Organization {
            id: parse_uuid(&self.record_id, "organization id")?,
            name: self.name,
            timezone: self.timezone,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Reject timezones the schedule projection cannot interpret.
fn validate_timezone(raw: &str) -> SlotwiseResult<()> {
    parse_offset(raw).map(|_| ())
}

/// SurrealDB implementation of the Organization repository.
#[derive(Clone)]
pub struct SurrealOrganizationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrganizationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrganizationRepository for SurrealOrganizationRepository<C> {
    async fn create(
        &self,
        input: CreateOrganization,
        settings: BookingSettings,
    ) -> SlotwiseResult<Organization> {
        if input.name.trim().is_empty() {
            return Err(SlotwiseError::invalid("organization name is required"));
        }
        validate_timezone(&input.timezone)?;
        settings.validate().map_err(SlotwiseError::invalid)?;

        let id = Uuid::new_v4();
        let status = input.status.unwrap_or(OrganizationStatus::Active);

        // Seven closed weekdays and a settings row keyed by the organization
        // id, so a fresh organization accepts no bookings until configured.
        run_checked!(
            self.db
                .query(
                    "BEGIN TRANSACTION; \
                     CREATE type::record('organization', $id) SET \
                     name = $name, timezone = $timezone, status = $status; \
                     FOR $day IN [0, 1, 2, 3, 4, 5, 6] { \
                         CREATE business_hours SET organization_id = $id, \
                         weekday = $day, opens_at = '00:00', \
                         closes_at = '00:00', closed = true; \
                     }; \
                     CREATE type::record('booking_settings', $id) SET \
                     organization_id = $id, \
                     slot_minutes = $slot_minutes, \
                     min_lead_minutes = $min_lead_minutes, \
                     max_horizon_days = $max_horizon_days, \
                     allow_overlap_per_staff = $allow_overlap_per_staff; \
                     COMMIT TRANSACTION;",
                )
                .bind(("id", id.to_string()))
                .bind(("name", input.name.trim().to_string()))
                .bind(("timezone", input.timezone))
                .bind(("status", status_to_string(status).to_string()))
                .bind(("slot_minutes", settings.slot_minutes))
                .bind(("min_lead_minutes", settings.min_lead_minutes))
                .bind(("max_horizon_days", settings.max_horizon_days))
                .bind(("allow_overlap_per_staff", settings.allow_overlap_per_staff))
        );

        info!(organization_id = %id, "Organization created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> SlotwiseResult<Organization> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('organization', $id) \
                 WHERE deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrganizationRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "organization".into(),
            id: id_str,
        })?;

        Ok(row.try_into_organization()?)
    }

    async fn update(&self, id: Uuid, input: UpdateOrganization) -> SlotwiseResult<Organization> {
        if let Some(ref tz) = input.timezone {
            validate_timezone(tz)?;
        }
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.timezone.is_some() {
            sets.push("timezone = $timezone");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('organization', $id) SET {} \
             WHERE deleted_at IS NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(timezone) = input.timezone {
            builder = builder.bind(("timezone", timezone));
        }
        if let Some(status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }
        run_checked!(builder);

        self.get_by_id(id).await
    }
}
