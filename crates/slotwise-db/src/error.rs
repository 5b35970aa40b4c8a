//! Database-specific error types and conversions.
//!
//! Guarded write transactions abort with `THROW '<marker>[:<detail>]'`.
//! The marker is recovered from the statement error text and turned into
//! the matching domain error, so callers never inspect SurrealDB messages.

use slotwise_core::error::SlotwiseError;
use uuid::Uuid;

/// Overlap re-check found a colliding booking; detail is its id.
pub(crate) const BOOKING_CONFLICT: &str = "booking_conflict";
/// Booking changed status between read and guarded write.
pub(crate) const BOOKING_STALE: &str = "booking_stale";
/// Booking vanished (or moved tenant) between read and guarded write.
pub(crate) const BOOKING_MISSING: &str = "booking_missing";
/// A non-terminal booking still references the service; detail is its id.
pub(crate) const SERVICE_IN_USE: &str = "service_in_use";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Transaction rejected: {0}")]
    Rejected(SlotwiseError),
}

impl DbError {
    pub(crate) fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode(format!("{what}: {err}"))
    }

    /// Pick the most specific failure out of a response's statement
    /// errors. Recognised markers win over generic failures.
    pub(crate) fn from_statement_errors(
        errors: impl IntoIterator<Item = surrealdb::Error>,
    ) -> Option<Self> {
        let mut fallback = None;
        for err in errors {
            if let Some(rejected) = classify(&err.to_string()) {
                return Some(Self::Rejected(rejected));
            }
            fallback.get_or_insert(err);
        }
        fallback.map(Self::Surreal)
    }
}

impl From<surrealdb::Error> for DbError {
    fn from(err: surrealdb::Error) -> Self {
        match classify(&err.to_string()) {
            Some(rejected) => Self::Rejected(rejected),
            None => Self::Surreal(err),
        }
    }
}

impl From<DbError> for SlotwiseError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SlotwiseError::NotFound { entity, id },
            DbError::Rejected(inner) => inner,
            other => SlotwiseError::Database(other.to_string()),
        }
    }
}

/// Text following `marker:` up to the next quote or whitespace.
fn marker_detail<'a>(message: &'a str, marker: &str) -> Option<&'a str> {
    let start = message.find(marker)? + marker.len();
    let rest = message[start..].strip_prefix(':')?;
    let end = rest
        .find(|c: char| c == '\'' || c == '"' || c == '`' || c.is_whitespace())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn unique_index_entity(message: &str) -> &'static str {
    const INDEXES: [(&str, &str); 4] = [
        ("idx_customer_", "customer"),
        ("idx_service_", "service"),
        ("idx_business_hours_", "business_hours"),
        ("idx_booking_line_", "booking_line"),
    ];
    INDEXES
        .iter()
        .find(|(index, _)| message.contains(index))
        .map(|(_, entity)| *entity)
        .unwrap_or("record")
}

fn classify(message: &str) -> Option<SlotwiseError> {
    if message.contains(BOOKING_CONFLICT) {
        let booking_id =
            marker_detail(message, BOOKING_CONFLICT).and_then(|id| Uuid::parse_str(id).ok());
        return Some(SlotwiseError::Conflict { booking_id });
    }
    if message.contains(SERVICE_IN_USE) {
        return Some(SlotwiseError::InUse {
            entity: "service".into(),
            id: marker_detail(message, SERVICE_IN_USE)
                .unwrap_or_default()
                .to_string(),
        });
    }
    if message.contains(BOOKING_MISSING) {
        return Some(SlotwiseError::not_found(
            "booking",
            marker_detail(message, BOOKING_MISSING).unwrap_or_default(),
        ));
    }
    if message.contains(BOOKING_STALE) {
        return Some(SlotwiseError::Serialization(
            "booking changed concurrently".into(),
        ));
    }
    if message.contains("already contains") {
        return Some(SlotwiseError::AlreadyExists {
            entity: unique_index_entity(message).into(),
        });
    }
    let lower = message.to_lowercase();
    if lower.contains("can be retried")
        || lower.contains("conflict")
        || lower.contains("resource busy")
    {
        return Some(SlotwiseError::Serialization(message.to_string()));
    }
    None
}
