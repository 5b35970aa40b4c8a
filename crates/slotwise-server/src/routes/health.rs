use axum::Router;
use axum::routing::get;
use serde_json::{Value, json};

use crate::response::ApiResponse;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "status": "ok" }))
}
