//! SurrealDB implementation of [`StaffRepository`].

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::staff::{CreateStaff, Staff, UpdateStaff};
use slotwise_core::repository::StaffRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct StaffRowWithId {
    record_id: String,
    organization_id: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StaffRowWithId {
    pub(super) fn try_into_staff(self) -> Result<Staff, DbError> {
        Ok(Staff {
            id: parse_uuid(&self.record_id, "staff id")?,
            organization_id: parse_uuid(&self.organization_id, "staff organization")?,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Staff repository.
#[derive(Clone)]
pub struct SurrealStaffRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStaffRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> StaffRepository for SurrealStaffRepository<C> {
    async fn create(&self, input: CreateStaff) -> SlotwiseResult<Staff> {
        if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(SlotwiseError::invalid("staff first and last name are required"));
        }

        let id = Uuid::new_v4();
        run_checked!(
            self.db
                .query(
                    "CREATE type::record('staff', $id) SET \
                     organization_id = $organization_id, \
                     first_name = $first_name, last_name = $last_name, \
                     is_active = true",
                )
                .bind(("id", id.to_string()))
                .bind(("organization_id", input.organization_id.to_string()))
                .bind(("first_name", input.first_name.trim().to_string()))
                .bind(("last_name", input.last_name.trim().to_string()))
        );

        self.get_by_id(input.organization_id, id).await
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Staff> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('staff', $id) \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StaffRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "staff".into(),
            id: id_str,
        })?;

        Ok(row.try_into_staff()?)
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateStaff,
    ) -> SlotwiseResult<Staff> {
        self.get_by_id(organization_id, id).await?;

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('staff', $id) SET {} \
             WHERE organization_id = $organization_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("organization_id", organization_id.to_string()));
        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        run_checked!(builder);

        self.get_by_id(organization_id, id).await
    }
}
