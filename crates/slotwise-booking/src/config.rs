//! Booking configuration.

use std::time::Duration;

use slotwise_core::models::business_hours::BookingSettings;

/// Configuration for the booking orchestrator.
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Settings reported for organizations without a settings row.
    pub default_settings: BookingSettings,
    /// Page size used when a listing does not ask for one.
    pub default_page_size: u64,
    /// Largest page size a listing may ask for.
    pub max_page_size: u64,
    /// Retries after a serialization failure before giving up with
    /// `Conflict` (default: 3).
    pub max_serialization_retries: u32,
    /// Lower bound of the jittered retry backoff in milliseconds.
    pub backoff_min_ms: u64,
    /// Upper bound of the jittered retry backoff in milliseconds.
    pub backoff_max_ms: u64,
    /// Deadline for one booking operation (default: 10 seconds).
    pub operation_timeout: Duration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            default_settings: BookingSettings::default(),
            default_page_size: 20,
            max_page_size: 100,
            max_serialization_retries: 3,
            backoff_min_ms: 1,
            backoff_max_ms: 10,
            operation_timeout: Duration::from_secs(10),
        }
    }
}
