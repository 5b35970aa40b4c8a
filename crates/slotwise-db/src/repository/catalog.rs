//! SurrealDB implementation of the booking core's [`Catalog`] view.

use std::collections::HashMap;

use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::customer::Customer;
use slotwise_core::models::organization::Organization;
use slotwise_core::models::service::Service;
use slotwise_core::models::staff::Staff;
use slotwise_core::models::vehicle::Vehicle;
use slotwise_core::repository::{
    Catalog, CustomerRepository, OrganizationRepository, StaffRepository, VehicleRepository,
};
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::customer::SurrealCustomerRepository;
use super::organization::SurrealOrganizationRepository;
use super::service::ServiceRowWithId;
use super::staff::SurrealStaffRepository;
use super::vehicle::SurrealVehicleRepository;
use crate::error::DbError;

/// Tenant-scoped lookups over the catalog tables.
#[derive(Clone)]
pub struct SurrealCatalog<C: Connection> {
    db: Surreal<C>,
    organizations: SurrealOrganizationRepository<C>,
    customers: SurrealCustomerRepository<C>,
    staff: SurrealStaffRepository<C>,
    vehicles: SurrealVehicleRepository<C>,
}

impl<C: Connection> SurrealCatalog<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            organizations: SurrealOrganizationRepository::new(db.clone()),
            customers: SurrealCustomerRepository::new(db.clone()),
            staff: SurrealStaffRepository::new(db.clone()),
            vehicles: SurrealVehicleRepository::new(db.clone()),
            db,
        }
    }
}

impl<C: Connection> Catalog for SurrealCatalog<C> {
    async fn resolve_organization(&self, organization_id: Uuid) -> SlotwiseResult<Organization> {
        self.organizations.get_by_id(organization_id).await
    }

    async fn resolve_services(
        &self,
        organization_id: Uuid,
        service_ids: &[Uuid],
    ) -> SlotwiseResult<Vec<Service>> {
        let ids: Vec<String> = service_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM service \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE \
                 AND meta::id(id) INSIDE $ids",
            )
            .bind(("organization_id", organization_id.to_string()))
            .bind(("ids", serde_json::json!(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ServiceRowWithId> = result.take(0).map_err(DbError::from)?;
        let mut by_id = rows
            .into_iter()
            .map(|row| row.try_into_service().map(|s| (s.id, s)))
            .collect::<Result<HashMap<_, _>, DbError>>()?;

        let mut services = Vec::with_capacity(service_ids.len());
        for id in service_ids {
            let service = by_id
                .remove(id)
                .ok_or_else(|| SlotwiseError::not_found("service", id))?;
            if !service.is_active {
                return Err(SlotwiseError::invalid(format!(
                    "service {} ({}) is inactive",
                    service.name, service.id
                )));
            }
            services.push(service);
        }
        Ok(services)
    }

    async fn resolve_customer(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Customer> {
        self.customers.get_by_id(organization_id, id).await
    }

    async fn resolve_staff(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Staff> {
        self.staff.get_by_id(organization_id, id).await
    }

    async fn resolve_vehicle(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Vehicle> {
        self.vehicles.get_by_id(organization_id, id).await
    }
}
