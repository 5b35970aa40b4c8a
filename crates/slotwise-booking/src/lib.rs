//! Slotwise Booking: the booking orchestrator and slot engine.
//!
//! Generic over the repository traits of `slotwise-core`, so this crate
//! has no dependency on the database crate outside its tests.

pub mod clock;
pub mod config;
pub mod retry;
pub mod service;
pub mod slots;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BookingConfig;
pub use service::BookingService;
pub use slots::SlotEngine;
