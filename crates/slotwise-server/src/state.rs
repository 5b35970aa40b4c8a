//! Shared application state handed to every handler.

use std::sync::Arc;

use slotwise_auth::AuthConfig;
use slotwise_booking::{BookingConfig, BookingService, Clock, SystemClock};
use slotwise_db::repository::{
    SurrealBookingRepository, SurrealBusinessHoursRepository, SurrealCatalog,
};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;

/// The booking service wired to SurrealDB.
pub type Bookings = BookingService<
    SurrealCatalog<Any>,
    SurrealBusinessHoursRepository<Any>,
    SurrealBookingRepository<Any>,
>;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<Bookings>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(db: Surreal<Any>, auth: AuthConfig, booking: BookingConfig) -> Self {
        Self::with_clock(db, auth, booking, Arc::new(SystemClock))
    }

    pub fn with_clock(
        db: Surreal<Any>,
        auth: AuthConfig,
        booking: BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hours =
            SurrealBusinessHoursRepository::with_defaults(db.clone(), booking.default_settings);
        let bookings = BookingService::with_clock(
            SurrealCatalog::new(db.clone()),
            hours,
            SurrealBookingRepository::new(db),
            booking,
            clock,
        );
        Self {
            bookings: Arc::new(bookings),
            auth: Arc::new(auth),
        }
    }
}
