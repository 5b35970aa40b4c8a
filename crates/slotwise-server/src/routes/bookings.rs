//! Booking endpoints. The organization always comes from the bearer
//! token, never from the request.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::models::booking::{Booking, BookingInput, BookingStatus, ListQuery, Page};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Authenticated};
use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list).post(create))
        .route("/bookings/available-slots", get(available_slots))
        .route("/bookings/:id", get(fetch).put(update).delete(remove))
        .route("/bookings/:id/status", patch(set_status))
}

async fn list(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<Page<Booking>>> {
    Ok(ApiResponse::ok(state.bookings.list(&ctx, query).await?))
}

async fn create(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiJson(input): ApiJson<BookingInput>,
) -> ApiResult<ApiResponse<Booking>> {
    Ok(ApiResponse::created(state.bookings.create(&ctx, input).await?))
}

async fn fetch(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Booking>> {
    Ok(ApiResponse::ok(state.bookings.get(&ctx, id).await?))
}

async fn update(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<BookingInput>,
) -> ApiResult<ApiResponse<Booking>> {
    Ok(ApiResponse::ok(state.bookings.update(&ctx, id, input).await?))
}

#[derive(Debug, Deserialize)]
struct StatusChange {
    status: BookingStatus,
}

async fn set_status(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusChange>,
) -> ApiResult<ApiResponse<Booking>> {
    Ok(ApiResponse::ok(
        state.bookings.set_status(&ctx, id, body.status).await?,
    ))
}

async fn remove(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.bookings.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SlotQuery {
    date: NaiveDate,
    #[serde(default)]
    service_ids: Vec<Uuid>,
    staff_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct Slots {
    date: NaiveDate,
    slots: Vec<DateTime<Utc>>,
}

async fn available_slots(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ApiQuery(query): ApiQuery<SlotQuery>,
) -> ApiResult<ApiResponse<Slots>> {
    let slots = state
        .bookings
        .available_slots(&ctx, query.date, &query.service_ids, query.staff_id)
        .await?;
    Ok(ApiResponse::ok(Slots {
        date: query.date,
        slots,
    }))
}
