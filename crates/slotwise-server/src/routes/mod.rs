//! HTTP routes.

mod bookings;
mod health;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The complete application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/api/v1", bookings::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
