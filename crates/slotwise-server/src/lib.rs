//! Slotwise Server: the booking API over HTTP.
//!
//! Routes live under `/api/v1` and require a bearer token, except
//! `GET /health`. Every response uses the `{success, data?, error?}`
//! envelope.

pub mod config;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
