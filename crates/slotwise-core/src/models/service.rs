//! Service (catalog offering) domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable offering, e.g. "Oil change" in category "Maintenance".
///
/// Unique per organization by `(category, name)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price: Decimal,
    pub requires_vehicle: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateService {
    pub organization_id: Uuid,
    pub name: String,
    pub category: String,
    pub duration_minutes: u32,
    pub price: Decimal,
    pub requires_vehicle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateService {
    pub name: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<u32>,
    /// Existing bookings keep their price snapshot.
    pub price: Option<Decimal>,
    pub requires_vehicle: Option<bool>,
    pub is_active: Option<bool>,
}
