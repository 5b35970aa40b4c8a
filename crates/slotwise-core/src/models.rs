//! Domain models for Slotwise.
//!
//! Every tenant-scoped entity carries an `organization_id`; the booking
//! core never reads one from request input.

pub mod booking;
pub mod business_hours;
pub mod customer;
pub mod money;
pub mod organization;
pub mod service;
pub mod staff;
pub mod vehicle;
