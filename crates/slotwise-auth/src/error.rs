//! Authentication error types.

use slotwise_core::error::SlotwiseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    TokenMissing,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for SlotwiseError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenMissing
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_)
            | AuthError::InvalidClaims(_) => SlotwiseError::Unauthenticated,
            AuthError::Crypto(msg) => SlotwiseError::Internal(msg),
        }
    }
}
