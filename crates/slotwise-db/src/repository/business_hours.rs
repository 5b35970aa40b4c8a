//! SurrealDB implementation of [`BusinessHoursRepository`].
//!
//! Weekly hours live in seven `business_hours` rows per organization,
//! opening and closing times as `HH:MM` strings. Booking-window settings
//! live in one `booking_settings` row keyed by the organization id.

use chrono::NaiveTime;
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use slotwise_core::models::business_hours::{
    BookingSettings, WeekdayHours, WeeklySchedule, validate_week,
};
use slotwise_core::repository::{BusinessHoursRepository, OrganizationRepository};
use slotwise_core::time::parse_offset;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use uuid::Uuid;

use super::organization::SurrealOrganizationRepository;
use crate::error::DbError;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, SurrealValue)]
struct BusinessHoursRow {
    weekday: u8,
    opens_at: String,
    closes_at: String,
    closed: bool,
}

impl BusinessHoursRow {
    fn try_into_hours(self) -> Result<WeekdayHours, DbError> {
        let parse = |raw: &str| {
            NaiveTime::parse_from_str(raw, TIME_FORMAT).map_err(|e| DbError::decode("hours", e))
        };
        Ok(WeekdayHours {
            weekday: self.weekday,
            opens_at: parse(&self.opens_at)?,
            closes_at: parse(&self.closes_at)?,
            closed: self.closed,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct BookingSettingsRow {
    slot_minutes: u32,
    min_lead_minutes: u32,
    max_horizon_days: u32,
    allow_overlap_per_staff: bool,
}

impl From<BookingSettingsRow> for BookingSettings {
    fn from(row: BookingSettingsRow) -> Self {
        Self {
            slot_minutes: row.slot_minutes,
            min_lead_minutes: row.min_lead_minutes,
            max_horizon_days: row.max_horizon_days,
            allow_overlap_per_staff: row.allow_overlap_per_staff,
        }
    }
}

/// Fill weekdays missing from `week` with closed days, ordered 0..=6.
fn complete_week(week: &[WeekdayHours]) -> Vec<WeekdayHours> {
    (0..7u8)
        .map(|weekday| {
            week.iter()
                .find(|d| d.weekday == weekday)
                .copied()
                .unwrap_or_else(|| WeekdayHours::closed(weekday))
        })
        .collect()
}

/// SurrealDB implementation of the BusinessHours repository.
#[derive(Clone)]
pub struct SurrealBusinessHoursRepository<C: Connection> {
    db: Surreal<C>,
    /// Settings reported for organizations without a settings row.
    defaults: BookingSettings,
}

impl<C: Connection> SurrealBusinessHoursRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            db,
            defaults: BookingSettings::default(),
        }
    }

    pub fn with_defaults(db: Surreal<C>, defaults: BookingSettings) -> Self {
        Self { db, defaults }
    }
}

impl<C: Connection> BusinessHoursRepository for SurrealBusinessHoursRepository<C> {
    async fn get_week(&self, organization_id: Uuid) -> SlotwiseResult<Vec<WeekdayHours>> {
        let mut result = self
            .db
            .query(
                "SELECT weekday, opens_at, closes_at, closed FROM business_hours \
                 WHERE organization_id = $organization_id \
                 ORDER BY weekday ASC",
            )
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BusinessHoursRow> = result.take(0).map_err(DbError::from)?;
        let week = rows
            .into_iter()
            .map(BusinessHoursRow::try_into_hours)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(week)
    }

    async fn set_week(
        &self,
        organization_id: Uuid,
        week: Vec<WeekdayHours>,
    ) -> SlotwiseResult<Vec<WeekdayHours>> {
        validate_week(&week).map_err(SlotwiseError::invalid)?;
        SurrealOrganizationRepository::new(self.db.clone())
            .get_by_id(organization_id)
            .await?;

        let days: Vec<serde_json::Value> = complete_week(&week)
            .iter()
            .map(|d| {
                serde_json::json!({
                    "weekday": d.weekday,
                    "opens_at": d.opens_at.format(TIME_FORMAT).to_string(),
                    "closes_at": d.closes_at.format(TIME_FORMAT).to_string(),
                    "closed": !d.is_open(),
                })
            })
            .collect();

        run_checked!(
            self.db
                .query(
                    "BEGIN TRANSACTION; \
                     DELETE business_hours \
                         WHERE organization_id = $organization_id; \
                     FOR $day IN $days { \
                         CREATE business_hours SET \
                         organization_id = $organization_id, \
                         weekday = $day.weekday, \
                         opens_at = $day.opens_at, \
                         closes_at = $day.closes_at, \
                         closed = $day.closed; \
                     }; \
                     COMMIT TRANSACTION;",
                )
                .bind(("organization_id", organization_id.to_string()))
                .bind(("days", serde_json::Value::Array(days)))
        );

        info!(organization_id = %organization_id, "Business hours replaced");
        self.get_week(organization_id).await
    }

    async fn schedule(&self, organization_id: Uuid) -> SlotwiseResult<WeeklySchedule> {
        let organization = SurrealOrganizationRepository::new(self.db.clone())
            .get_by_id(organization_id)
            .await?;
        let offset = parse_offset(&organization.timezone)?;
        let week = self.get_week(organization_id).await?;
        Ok(WeeklySchedule::new(offset, &week))
    }

    async fn settings(&self, organization_id: Uuid) -> SlotwiseResult<BookingSettings> {
        let mut result = self
            .db
            .query(
                "SELECT slot_minutes, min_lead_minutes, max_horizon_days, \
                 allow_overlap_per_staff \
                 FROM type::record('booking_settings', $organization_id)",
            )
            .bind(("organization_id", organization_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<BookingSettingsRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(BookingSettings::from)
            .unwrap_or(self.defaults))
    }

    async fn update_settings(
        &self,
        organization_id: Uuid,
        settings: BookingSettings,
    ) -> SlotwiseResult<BookingSettings> {
        settings.validate().map_err(SlotwiseError::invalid)?;
        SurrealOrganizationRepository::new(self.db.clone())
            .get_by_id(organization_id)
            .await?;

        run_checked!(
            self.db
                .query(
                    "UPSERT type::record('booking_settings', $organization_id) SET \
                     organization_id = $organization_id, \
                     slot_minutes = $slot_minutes, \
                     min_lead_minutes = $min_lead_minutes, \
                     max_horizon_days = $max_horizon_days, \
                     allow_overlap_per_staff = $allow_overlap_per_staff, \
                     updated_at = time::now()",
                )
                .bind(("organization_id", organization_id.to_string()))
                .bind(("slot_minutes", settings.slot_minutes))
                .bind(("min_lead_minutes", settings.min_lead_minutes))
                .bind(("max_horizon_days", settings.max_horizon_days))
                .bind(("allow_overlap_per_staff", settings.allow_overlap_per_staff))
        );

        info!(organization_id = %organization_id, "Booking settings updated");
        self.settings(organization_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_weekdays_are_filled_closed() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let week = complete_week(&[WeekdayHours::open(3, nine, five)]);
        assert_eq!(week.len(), 7);
        assert!(week[3].is_open());
        assert!(week.iter().filter(|d| d.weekday != 3).all(|d| d.closed));
        assert_eq!(week.iter().map(|d| d.weekday).collect::<Vec<_>>(), [0, 1, 2, 3, 4, 5, 6]);
    }
}
