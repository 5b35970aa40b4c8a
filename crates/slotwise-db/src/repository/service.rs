//! SurrealDB implementation of [`ServiceRepository`].
//!
//! Prices are stored as integer cents. Bookings copy name, price and
//! duration onto their lines, so edits here never rewrite history.

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::money;
use slotwise_core::models::service::{CreateService, Service, UpdateService};
use slotwise_core::repository::ServiceRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::{TERMINAL_STATUSES, parse_uuid};
use crate::error::{DbError, SERVICE_IN_USE};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct ServiceRowWithId {
    record_id: String,
    organization_id: String,
    name: String,
    category: String,
    duration_minutes: u32,
    price_cents: i64,
    requires_vehicle: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ServiceRowWithId {
    pub(super) fn try_into_service(self) -> Result<Service, DbError> {
        Ok(Service {
            id: parse_uuid(&self.record_id, "service id")?,
            organization_id: parse_uuid(&self.organization_id, "service organization")?,
            name: self.name,
            category: self.category,
            duration_minutes: self.duration_minutes,
            price: money::from_cents(self.price_cents),
            requires_vehicle: self.requires_vehicle,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn price_cents(price: rust_decimal::Decimal) -> SlotwiseResult<i64> {
    money::to_cents(price).map_err(SlotwiseError::invalid)
}

/// SurrealDB implementation of the Service repository.
#[derive(Clone)]
pub struct SurrealServiceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealServiceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ServiceRepository for SurrealServiceRepository<C> {
    async fn create(&self, input: CreateService) -> SlotwiseResult<Service> {
        if input.name.trim().is_empty() {
            return Err(SlotwiseError::invalid("service name is required"));
        }
        if input.duration_minutes == 0 {
            return Err(SlotwiseError::invalid("service duration must be positive"));
        }
        let cents = price_cents(input.price)?;

        let id = Uuid::new_v4();
        run_checked!(
            self.db
                .query(
                    "CREATE type::record('service', $id) SET \
                     organization_id = $organization_id, \
                     name = $name, category = $category, \
                     duration_minutes = $duration_minutes, \
                     price_cents = $price_cents, \
                     requires_vehicle = $requires_vehicle, \
                     is_active = true",
                )
                .bind(("id", id.to_string()))
                .bind(("organization_id", input.organization_id.to_string()))
                .bind(("name", input.name.trim().to_string()))
                .bind(("category", input.category.trim().to_string()))
                .bind(("duration_minutes", input.duration_minutes))
                .bind(("price_cents", cents))
                .bind(("requires_vehicle", input.requires_vehicle))
        );

        self.get_by_id(input.organization_id, id).await
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Service> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('service', $id) \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "service".into(),
            id: id_str,
        })?;

        Ok(row.try_into_service()?)
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateService,
    ) -> SlotwiseResult<Service> {
        if input.duration_minutes == Some(0) {
            return Err(SlotwiseError::invalid("service duration must be positive"));
        }
        let cents = input.price.map(price_cents).transpose()?;
        self.get_by_id(organization_id, id).await?;

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.category.is_some() {
            sets.push("category = $category");
        }
        if input.duration_minutes.is_some() {
            sets.push("duration_minutes = $duration_minutes");
        }
        if cents.is_some() {
            sets.push("price_cents = $price_cents");
        }
        if input.requires_vehicle.is_some() {
            sets.push("requires_vehicle = $requires_vehicle");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('service', $id) SET {} \
             WHERE organization_id = $organization_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("organization_id", organization_id.to_string()));
        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(category) = input.category {
            builder = builder.bind(("category", category));
        }
        if let Some(duration_minutes) = input.duration_minutes {
            builder = builder.bind(("duration_minutes", duration_minutes));
        }
        if let Some(cents) = cents {
            builder = builder.bind(("price_cents", cents));
        }
        if let Some(requires_vehicle) = input.requires_vehicle {
            builder = builder.bind(("requires_vehicle", requires_vehicle));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        run_checked!(builder);

        self.get_by_id(organization_id, id).await
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<()> {
        self.get_by_id(organization_id, id).await?;

        let query = format!(
            "BEGIN TRANSACTION; \
             LET $referencing = (SELECT VALUE booking_id FROM booking_line \
                 WHERE organization_id = $organization_id \
                 AND service_id = $id); \
             LET $live = (SELECT VALUE meta::id(id) FROM booking \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE \
                 AND status NOTINSIDE {TERMINAL_STATUSES} \
                 AND meta::id(id) INSIDE $referencing); \
             IF array::len($live) > 0 {{ \
                 THROW string::concat('{SERVICE_IN_USE}:', $id); \
             }}; \
             DELETE type::record('service', $id) \
                 WHERE organization_id = $organization_id; \
             COMMIT TRANSACTION;"
        );

        run_checked!(
            self.db
                .query(&query)
                .bind(("id", id.to_string()))
                .bind(("organization_id", organization_id.to_string()))
        );

        info!(organization_id = %organization_id, service_id = %id, "Service deleted");
        Ok(())
    }
}
