//! Mapping of booking errors onto HTTP responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::QueryRejection;
use serde_json::{Value, json};
use slotwise_auth::AuthError;
use slotwise_core::error::SlotwiseError;
use tracing::{error, warn};
use uuid::Uuid;

use crate::response::{Envelope, ErrorBody};

/// Error returned by handlers and extractors.
#[derive(Debug)]
pub struct ApiError(pub SlotwiseError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<SlotwiseError> for ApiError {
    fn from(err: SlotwiseError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Crypto(reason) = &err {
            warn!(reason = %reason, "Token verification key unusable");
        }
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(SlotwiseError::invalid(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(SlotwiseError::invalid(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(SlotwiseError::invalid(rejection.to_string()))
    }
}

fn details(err: &SlotwiseError) -> Option<Value> {
    match err {
        SlotwiseError::Conflict {
            booking_id: Some(id),
        } => Some(json!({ "bookingId": id })),
        SlotwiseError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
        SlotwiseError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if err.is_internal() {
            let correlation_id = Uuid::new_v4();
            error!(correlation_id = %correlation_id, error = %err, "Request failed");
            ErrorBody {
                code: err.code(),
                message: "An internal error occurred".into(),
                details: Some(json!({ "correlationId": correlation_id })),
            }
        } else {
            ErrorBody {
                code: err.code(),
                message: err.to_string(),
                details: details(&err),
            }
        };

        let envelope: Envelope<()> = Envelope {
            success: false,
            data: None,
            error: Some(body),
        };
        (status, Json(envelope)).into_response()
    }
}
