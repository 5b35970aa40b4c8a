//! SurrealDB implementation of [`CustomerRepository`].
//!
//! Email uniqueness per organization is enforced by a unique index over
//! `email_key`: the normalized email when present, otherwise a
//! placeholder derived from the record id so email-less customers never
//! collide.

use chrono::{DateTime, Utc};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::customer::{CreateCustomer, Customer, NewCustomer, UpdateCustomer};
use slotwise_core::repository::CustomerRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(super) struct CustomerRowWithId {
    record_id: String,
    organization_id: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    email: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRowWithId {
    pub(super) fn try_into_customer(self) -> Result<Customer, DbError> {
        Ok(Customer {
            id: parse_uuid(&self.record_id, "customer id")?,
            organization_id: parse_uuid(&self.organization_id, "customer organization")?,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            email: self.email,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Value of the unique `email_key` column for a customer.
pub(super) fn email_key(id: Uuid, email: Option<&str>) -> String {
    match email {
        Some(email) => email.to_string(),
        None => format!("none:{id}"),
    }
}

/// Normalize and validate inline or standalone customer details.
pub(super) fn prepare(details: &NewCustomer) -> SlotwiseResult<NewCustomer> {
    let details = details.normalized();
    details.validate().map_err(SlotwiseError::invalid)?;
    Ok(details)
}

/// `CREATE` statement shared with the booking insert transaction.
pub(super) const CREATE_CUSTOMER: &str = "\
    CREATE type::record('customer', $customer_id) SET \
    organization_id = $organization_id, \
    first_name = $first_name, last_name = $last_name, \
    phone = $phone, email = $email, email_key = $email_key, \
    is_active = true;";

/// SurrealDB implementation of the Customer repository.
#[derive(Clone)]
pub struct SurrealCustomerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCustomerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CustomerRepository for SurrealCustomerRepository<C> {
    async fn create(&self, input: CreateCustomer) -> SlotwiseResult<Customer> {
        let details = prepare(&input.details)?;
        let id = Uuid::new_v4();

        run_checked!(
            self.db
                .query(CREATE_CUSTOMER)
                .bind(("customer_id", id.to_string()))
                .bind(("organization_id", input.organization_id.to_string()))
                .bind(("first_name", details.first_name))
                .bind(("last_name", details.last_name))
                .bind(("phone", details.phone))
                .bind(("email_key", email_key(id, details.email.as_deref())))
                .bind(("email", details.email))
        );

        self.get_by_id(input.organization_id, id).await
    }

    async fn get_by_id(&self, organization_id: Uuid, id: Uuid) -> SlotwiseResult<Customer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('customer', $id) \
                 WHERE organization_id = $organization_id \
                 AND deleted_at IS NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomerRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "customer".into(),
            id: id_str,
        })?;

        Ok(row.try_into_customer()?)
    }

    async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateCustomer,
    ) -> SlotwiseResult<Customer> {
        self.get_by_id(organization_id, id).await?;

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('customer', $id) SET {} \
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
        if let Some(phone) = input.phone {
            // Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("phone", phone));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        run_checked!(builder);

        self.get_by_id(organization_id, id).await
    }
}
