//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings, both as record keys and as references.
//! Enums are stored as snake_case strings with ASSERT constraints.
//! Money is stored as integer cents; wall-clock times as `HH:MM`.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "booking_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Organizations (tenant root)
-- =======================================================================
DEFINE TABLE organization SCHEMAFULL;
DEFINE FIELD name ON TABLE organization TYPE string;
DEFINE FIELD timezone ON TABLE organization TYPE string;
DEFINE FIELD status ON TABLE organization TYPE string \
    ASSERT $value IN ['active', 'pending', 'suspended'];
DEFINE FIELD created_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE organization TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE organization TYPE option<datetime>;

-- =======================================================================
-- Business hours (one row per weekday, 0 = Sunday)
-- =======================================================================
DEFINE TABLE business_hours SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE business_hours TYPE string;
DEFINE FIELD weekday ON TABLE business_hours TYPE int \
    ASSERT $value >= 0 AND $value <= 6;
DEFINE FIELD opens_at ON TABLE business_hours TYPE string;
DEFINE FIELD closes_at ON TABLE business_hours TYPE string;
DEFINE FIELD closed ON TABLE business_hours TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE business_hours TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE business_hours TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_business_hours_org_weekday ON TABLE business_hours \
    COLUMNS organization_id, weekday UNIQUE;

-- =======================================================================
-- Booking settings (record key = organization id)
-- =======================================================================
DEFINE TABLE booking_settings SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE booking_settings TYPE string;
DEFINE FIELD slot_minutes ON TABLE booking_settings TYPE int \
    ASSERT $value >= 1;
DEFINE FIELD min_lead_minutes ON TABLE booking_settings TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD max_horizon_days ON TABLE booking_settings TYPE int \
    ASSERT $value >= 1;
DEFINE FIELD allow_overlap_per_staff ON TABLE booking_settings TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE booking_settings TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE booking_settings TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Customers (email_key = lowercase email, or a per-row placeholder)
-- =======================================================================
DEFINE TABLE customer SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE customer TYPE string;
DEFINE FIELD first_name ON TABLE customer TYPE string;
DEFINE FIELD last_name ON TABLE customer TYPE string;
DEFINE FIELD phone ON TABLE customer TYPE option<string>;
DEFINE FIELD email ON TABLE customer TYPE option<string>;
DEFINE FIELD email_key ON TABLE customer TYPE string;
DEFINE FIELD is_active ON TABLE customer TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE customer TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE customer TYPE option<datetime>;
DEFINE INDEX idx_customer_org_email ON TABLE customer \
    COLUMNS organization_id, email_key UNIQUE;

-- =======================================================================
-- Vehicles
-- =======================================================================
DEFINE TABLE vehicle SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE vehicle TYPE string;
DEFINE FIELD customer_id ON TABLE vehicle TYPE string;
DEFINE FIELD make ON TABLE vehicle TYPE string;
DEFINE FIELD model ON TABLE vehicle TYPE string;
DEFINE FIELD plate ON TABLE vehicle TYPE string;
DEFINE FIELD mileage ON TABLE vehicle TYPE option<int>;
DEFINE FIELD is_active ON TABLE vehicle TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE vehicle TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE vehicle TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE vehicle TYPE option<datetime>;
DEFINE INDEX idx_vehicle_org_customer ON TABLE vehicle \
    COLUMNS organization_id, customer_id;

-- =======================================================================
-- Services (catalog offerings)
-- =======================================================================
DEFINE TABLE service SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE service TYPE string;
DEFINE FIELD name ON TABLE service TYPE string;
DEFINE FIELD category ON TABLE service TYPE string;
DEFINE FIELD duration_minutes ON TABLE service TYPE int \
    ASSERT $value > 0;
DEFINE FIELD price_cents ON TABLE service TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD requires_vehicle ON TABLE service TYPE bool DEFAULT false;
DEFINE FIELD is_active ON TABLE service TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE service TYPE option<datetime>;
DEFINE INDEX idx_service_org_category_name ON TABLE service \
    COLUMNS organization_id, category, name UNIQUE;

-- =======================================================================
-- Staff
-- =======================================================================
DEFINE TABLE staff SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE staff TYPE string;
DEFINE FIELD first_name ON TABLE staff TYPE string;
DEFINE FIELD last_name ON TABLE staff TYPE string;
DEFINE FIELD is_active ON TABLE staff TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE staff TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE staff TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE staff TYPE option<datetime>;

-- =======================================================================
-- Bookings
-- =======================================================================
DEFINE TABLE booking SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE booking TYPE string;
DEFINE FIELD customer_id ON TABLE booking TYPE string;
DEFINE FIELD staff_id ON TABLE booking TYPE option<string>;
DEFINE FIELD vehicle_id ON TABLE booking TYPE option<string>;
DEFINE FIELD start_time ON TABLE booking TYPE datetime;
DEFINE FIELD end_time ON TABLE booking TYPE datetime;
DEFINE FIELD status ON TABLE booking TYPE string \
    ASSERT $value IN ['scheduled', 'confirmed', 'in_progress', \
    'completed', 'cancelled', 'no_show'];
DEFINE FIELD total_price_cents ON TABLE booking TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD notes ON TABLE booking TYPE option<string>;
DEFINE FIELD created_by ON TABLE booking TYPE option<string>;
DEFINE FIELD created_at ON TABLE booking TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE booking TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD deleted_at ON TABLE booking TYPE option<datetime>;
DEFINE INDEX idx_booking_org_staff_start ON TABLE booking \
    COLUMNS organization_id, staff_id, start_time;
DEFINE INDEX idx_booking_org_start ON TABLE booking \
    COLUMNS organization_id, start_time;
DEFINE INDEX idx_booking_org_customer ON TABLE booking \
    COLUMNS organization_id, customer_id;

-- =======================================================================
-- Booking lines (ordered join with price and duration snapshots)
-- =======================================================================
DEFINE TABLE booking_line SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE booking_line TYPE string;
DEFINE FIELD booking_id ON TABLE booking_line TYPE string;
DEFINE FIELD service_id ON TABLE booking_line TYPE string;
DEFINE FIELD position ON TABLE booking_line TYPE int;
DEFINE FIELD service_name ON TABLE booking_line TYPE string;
DEFINE FIELD unit_price_cents ON TABLE booking_line TYPE int \
    ASSERT $value >= 0;
DEFINE FIELD duration_minutes ON TABLE booking_line TYPE int \
    ASSERT $value > 0;
DEFINE INDEX idx_booking_line_booking_position ON TABLE booking_line \
    COLUMNS booking_id, position UNIQUE;
DEFINE INDEX idx_booking_line_org_service ON TABLE booking_line \
    COLUMNS organization_id, service_id;

-- =======================================================================
-- Advisory locks (record key = organization_id:staff_id)
-- =======================================================================
DEFINE TABLE booking_lock SCHEMAFULL;
DEFINE FIELD organization_id ON TABLE booking_lock TYPE string;
DEFINE FIELD staff_id ON TABLE booking_lock TYPE string;
DEFINE FIELD acquired_at ON TABLE booking_lock TYPE datetime \
    DEFAULT time::now();
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn every_tenant_table_carries_organization_id() {
        for table in [
            "business_hours",
            "booking_settings",
            "customer",
            "vehicle",
            "service",
            "staff",
            "booking",
            "booking_line",
            "booking_lock",
        ] {
            let field = format!("DEFINE FIELD organization_id ON TABLE {table} ");
            assert!(SCHEMA_V1.contains(&field), "{table} lacks organization_id");
        }
    }
}
