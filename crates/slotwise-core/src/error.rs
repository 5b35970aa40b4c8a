//! Error types for the Slotwise booking system.

use thiserror::Error;
use uuid::Uuid;

use crate::models::booking::BookingStatus;

#[derive(Debug, Error)]
pub enum SlotwiseError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {message}")]
    Invalid { message: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("{entity} {id} is still referenced by active bookings")]
    InUse { entity: String, id: String },

    #[error("A vehicle is required for the selected services")]
    VehicleRequired,

    #[error("Vehicle does not belong to the booking's customer")]
    VehicleMismatch,

    #[error("Requested time is outside business hours")]
    OutsideHours,

    #[error("Requested time is outside the booking window: {reason}")]
    OutsideBookingWindow { reason: String },

    #[error("Time slot conflicts with an existing booking")]
    Conflict { booking_id: Option<Uuid> },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: String },

    #[error("Operation timed out")]
    Timeout,

    #[error("Transaction could not be serialized: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SlotwiseError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code surfaced to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Invalid { .. } => "INVALID",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::InUse { .. } => "IN_USE",
            Self::VehicleRequired => "VEHICLE_REQUIRED",
            Self::VehicleMismatch => "VEHICLE_MISMATCH",
            Self::OutsideHours => "OUTSIDE_HOURS",
            Self::OutsideBookingWindow { .. } => "OUTSIDE_BOOKING_WINDOW",
            Self::Conflict { .. } | Self::Serialization(_) => "CONFLICT",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Timeout => "TIMEOUT",
            Self::Database(_) | Self::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status mirroring the error kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Invalid { .. } | Self::VehicleRequired | Self::VehicleMismatch => 400,
            Self::OutsideHours | Self::OutsideBookingWindow { .. } => 422,
            Self::AlreadyExists { .. }
            | Self::InUse { .. }
            | Self::Conflict { .. }
            | Self::InvalidTransition { .. }
            | Self::Serialization(_) => 409,
            Self::Timeout => 504,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Whether a client may retry the identical request.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Database(_) | Self::Internal(_) | Self::Serialization(_)
        )
    }

    /// Internal failures are logged and replaced by an opaque message.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

pub type SlotwiseResult<T> = Result<T, SlotwiseError>;
