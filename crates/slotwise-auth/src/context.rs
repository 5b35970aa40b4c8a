//! The authenticated tenant a request acts for, and role gating.
//!
//! The organization id comes from the verified token only. Nothing that
//! runs under a [`TenantContext`] takes an organization id from request
//! input.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;
use crate::token::ValidatedClaims;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            "viewer" => Ok(Self::Viewer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Booking operations subject to role gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ViewBookings,
    CreateBooking,
    UpdateBooking,
    ChangeBookingStatus,
    DeleteBooking,
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ViewBookings => "view bookings",
            Self::CreateBooking => "create bookings",
            Self::UpdateBooking => "update bookings",
            Self::ChangeBookingStatus => "change booking status",
            Self::DeleteBooking => "delete bookings",
        }
    }
}

/// Who is acting, and for which organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

impl TenantContext {
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            organization_id,
            user_id,
            role,
        }
    }

    /// Build the context from verified token claims.
    pub fn from_claims(claims: &ValidatedClaims) -> Result<Self, AuthError> {
        let claims = &claims.0;
        let parse = |raw: &str, what: &str| {
            Uuid::parse_str(raw).map_err(|e| AuthError::InvalidClaims(format!("{what}: {e}")))
        };
        Ok(Self {
            organization_id: parse(&claims.org_id, "org_id")?,
            user_id: parse(&claims.sub, "sub")?,
            role: claims.role.parse().map_err(AuthError::InvalidClaims)?,
        })
    }

    pub fn permits(&self, operation: Operation) -> bool {
        match self.role {
            Role::Admin | Role::Manager => true,
            Role::Staff => operation != Operation::DeleteBooking,
            Role::Viewer => operation == Operation::ViewBookings,
        }
    }

    /// Fail `Forbidden` unless the role permits `operation`.
    pub fn require(&self, operation: Operation) -> SlotwiseResult<()> {
        if self.permits(operation) {
            return Ok(());
        }
        debug!(
            organization_id = %self.organization_id,
            user_id = %self.user_id,
            role = %self.role,
            operation = operation.as_str(),
            "Operation denied"
        );
        Err(SlotwiseError::forbidden(format!(
            "role {} may not {}",
            self.role,
            operation.as_str()
        )))
    }

    /// Admins may delete bookings that have not reached a terminal status.
    pub fn may_delete_live_bookings(&self) -> bool {
        self.role == Role::Admin
    }
}
