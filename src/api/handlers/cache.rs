//! Cache administration.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::Router;

use crate::app_state::AppState;

/// `DELETE /cache`: Drop the listing and bucket snapshots from every tier.
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.bucket_service.clear().await;
    StatusCode::NO_CONTENT
}

/// Cache admin routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/cache", delete(clear_cache))
}
