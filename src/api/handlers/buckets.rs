//! Bucket read handler.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{BucketListResponse, PaginationParams};
use crate::app_state::AppState;
use crate::error::CacheError;

/// `GET /buckets`: Buckets derived from the current listings, paginated.
///
/// Recomputes through the aggregation worker when the cached buckets no
/// longer match the listing snapshot or are past their TTL.
///
/// # Errors
///
/// Returns [`CacheError::InvalidRequest`] for unparseable paging parameters.
pub async fn list_buckets(
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<impl IntoResponse, CacheError> {
    let Query(params) =
        params.map_err(|rejection| CacheError::InvalidRequest(rejection.body_text()))?;
    let snapshot = state.bucket_service.current_buckets().await;
    let (data, pagination) = params.paginate(&snapshot.buckets);

    Ok(Json(BucketListResponse {
        updated_at: snapshot.updated_at,
        source_listings_updated_at: snapshot.source_listings_updated_at,
        total_listings: snapshot.total_listings(),
        data,
        pagination,
    }))
}

/// Bucket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/buckets", get(list_buckets))
}
