//! Slotwise Auth: EdDSA JWT verification and the tenant context every
//! booking operation runs under.

pub mod config;
pub mod context;
pub mod error;
pub mod token;

pub use config::AuthConfig;
pub use context::{Operation, Role, TenantContext};
pub use error::AuthError;
pub use token::{AccessTokenClaims, ValidatedClaims};
