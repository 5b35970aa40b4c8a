//! Organization domain model.
//!
//! Organizations are the tenant root: every customer, service, staff
//! member and booking belongs to exactly one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    Active,
    Pending,
    Suspended,
}

/// A business account (garage, salon, care provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Fixed UTC offset used for all wall-clock projections (e.g. `+02:00`).
    pub timezone: String,
    pub status: OrganizationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub timezone: String,
    pub status: Option<OrganizationStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub timezone: Option<String>,
    pub status: Option<OrganizationStatus>,
}
