//! Request extractors: the authenticated tenant and input parsers whose
//! rejections use the error envelope.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use slotwise_auth::TenantContext;
use slotwise_auth::token::{bearer_token, validate_access_token};

use crate::error::ApiError;
use crate::state::AppState;

/// The tenant context taken from a verified bearer token.
pub struct Authenticated(pub TenantContext);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = bearer_token(header)?;
        let claims = validate_access_token(token, &state.auth)?;
        Ok(Self(TenantContext::from_claims(&claims)?))
    }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string parser that accepts repeated keys as lists.
#[derive(FromRequestParts)]
#[from_request(via(axum_extra::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
