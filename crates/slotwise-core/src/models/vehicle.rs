//! Vehicle domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer's vehicle. Bookings for services that require a vehicle
/// must reference one owned by the booking's customer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub customer_id: Uuid,
    pub make: String,
    pub model: String,
    pub plate: String,
    pub mileage: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVehicle {
    pub organization_id: Uuid,
    pub customer_id: Uuid,
    pub make: String,
    pub model: String,
    pub plate: String,
    pub mileage: Option<u32>,
}
