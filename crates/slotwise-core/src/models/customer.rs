//! Customer domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    /// Unique per organization when present.
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomer {
    pub organization_id: Uuid,
    #[serde(flatten)]
    pub details: NewCustomer,
}

/// Customer details supplied inline on a booking request instead of a
/// `customer_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl NewCustomer {
    /// Trimmed copy with blank optionals collapsed to `None`.
    pub fn normalized(&self) -> Self {
        fn opt(v: &Option<String>) -> Option<String> {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        }
        Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            phone: opt(&self.phone),
            email: opt(&self.email).map(|e| e.to_lowercase()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err("customer first and last name are required".into());
        }
        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            if !email.contains('@') {
                return Err(format!("invalid customer email: {email}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCustomer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `Some(Some(v))` = set, `Some(None)` = clear, `None` = no change.
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_trims_and_lowercases_email() {
        let raw = NewCustomer {
            first_name: "  Ada ".into(),
            last_name: "Lovelace".into(),
            phone: Some("   ".into()),
            email: Some(" Ada@Example.COM ".into()),
        };
        let n = raw.normalized();
        assert_eq!(n.first_name, "Ada");
        assert_eq!(n.phone, None);
        assert_eq!(n.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn names_are_required() {
        let c = NewCustomer {
            first_name: "".into(),
            last_name: "X".into(),
            phone: None,
            email: None,
        };
        assert!(c.validate().is_err());
    }
}
