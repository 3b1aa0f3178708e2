//! Listing snapshot handlers: read and ingest.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{IngestListingsRequest, IngestListingsResponse, ListingsResponse};
use crate::app_state::AppState;
use crate::error::CacheError;

/// `GET /listings`: Current listing snapshot with freshness metadata.
pub async fn get_listings(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.bucket_service;
    let snapshot = service.current_listings().await;
    let updated_at = snapshot.as_ref().map(|s| s.updated_at);
    let stale = service
        .listing_cache()
        .is_stale(updated_at, Some(service.settings().listing_ttl));

    Json(ListingsResponse {
        updated_at,
        stale,
        count: snapshot.as_ref().map_or(0, |s| s.len()),
        listings: snapshot.map(|s| s.listings.clone()).unwrap_or_default(),
    })
}

/// `PUT /listings`: Replace the listing snapshot.
///
/// Bucket caches pick up the change lazily on the next read, since the new
/// snapshot carries a new timestamp.
///
/// # Errors
///
/// Returns [`CacheError::InvalidRequest`] when the body is not a listing
/// collection.
pub async fn put_listings(
    State(state): State<AppState>,
    payload: Result<Json<IngestListingsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CacheError> {
    let Json(req) =
        payload.map_err(|rejection| CacheError::InvalidRequest(rejection.body_text()))?;
    let snapshot = state.bucket_service.ingest_listings(req.listings).await;
    Ok((
        StatusCode::OK,
        Json(IngestListingsResponse {
            updated_at: snapshot.updated_at,
            count: snapshot.len(),
        }),
    ))
}

/// Listing routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/listings", get(get_listings).put(put_listings))
}
