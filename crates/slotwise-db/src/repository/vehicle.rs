//! SurrealDB implementation of [`VehicleRepository`].

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::vehicle::{CreateVehicle, Vehicle};
use slotwise_core::repository::{CustomerRepository, VehicleRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::customer::SurrealCustomerRepository;
use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct VehicleRowWithId {
    record_id: String,
    organization_id: String,
    customer_id: String,
    make: String,
    model: String,
    plate: String,
    mileage: Option<u32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VehicleRowWithId {
    pub(super) fn try_into_vehicle(self) -> Result<Vehicle, DbError> {
        Ok(Vehicle {
            id: parse_uuid(&self.record_id, "vehicle id")?,
            organization_id: parse_uuid(&self.organization_id, "vehicle organization")?,
            customer_id: parse_uuid(&self.customer_id, "vehicle customer")?,
            make: self.make,
            model: self.model,
            plate: self.plate,
            mileage: self.mileage,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Vehicle repository.
#[derive(Clone)]
pub struct SurrealVehicleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealVehicleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> VehicleRepository for SurrealVehicleRepository<C> {
    async fn create(&self, input: CreateVehicle) -> SlotwiseResult<Vehicle> {
        if input.plate.trim().is_empty() {
            return Err(SlotwiseError::invalid("vehicle plate is required"));
        }
        // The owner must exist in the same organization.
        SurrealCustomerRepository::new(self.db.clone())
            .get_by_id(input.organization_id, input.customer_id)
            .await?;

        let id = Uuid::new_v4();
        run_checked!(
            self.db
                .query(
                    "CREATE type::record('vehicle', $id) SET \
                     organization_id = $organization_id, \
                     customer_id = $customer_id, \
                     make = $make, model = $model, plate = $plate, \
                     mileage = $mileage, is_active = true",
                )
                .bind(("id", id.to_string()))
                .bind(("organization_id", input.organization_id.to_string()))
                .bind(("customer_id", input.customer_id.to_string()))
                .bind(("make", input.make))
                .bind(("model", input.model))
                .bind(("plate", input.plate.trim().to_uppercase()))
                .bind(("mileage", input.mileage))
        );

        self.get_by_id(input.organization_id, id).await
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Vehicle> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('vehicle', $id) \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VehicleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "vehicle".into(),
            id: id_str,
        })?;

        Ok(row.try_into_vehicle()?)
    }
}
