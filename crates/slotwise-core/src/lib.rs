//! Slotwise Core: domain models, error taxonomy, repository traits and
//! the pure time logic shared by every other crate.

pub mod error;
pub mod models;
pub mod repository;
pub mod time;
