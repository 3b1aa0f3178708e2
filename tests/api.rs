//! HTTP surface driven through the router without a socket.
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use tower::ServiceExt;

use listing_cache::api::build_app;
use listing_cache::app_state::AppState;
use listing_cache::cache::{BucketCache, CacheTiers, ListingCache};
use listing_cache::domain::EventBus;
use listing_cache::service::{BucketService, ServiceSettings};
use listing_cache::worker::{AggregationWorker, AlwaysInline};

fn app() -> Router {
    let event_bus = EventBus::new(16);
    let tiers = CacheTiers::in_process().with_events(event_bus.clone());
    let bucket_service = Arc::new(BucketService::new(
        Arc::new(ListingCache::new(tiers.clone())),
        Arc::new(BucketCache::new(tiers)),
        Arc::new(AggregationWorker::inline_only(AlwaysInline)),
        ServiceSettings::default(),
    ));
    build_app(AppState {
        bucket_service,
        event_bus,
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let Ok(request) = builder.body(body) else {
        panic!("request");
    };
    let Ok(response) = app.clone().oneshot(request).await else {
        panic!("router failed");
    };
    let status = response.status();
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body");
    };
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

fn listings_body() -> serde_json::Value {
    serde_json::json!({
        "listings": [
            {
                "id": "a",
                "attributes": { "brand": "Toyota", "model": "Camry", "year": "2021" },
                "price": "21000",
                "sellerId": "s1"
            },
            {
                "id": "b",
                "attributes": { "brand": "toyota", "model": "CAMRY", "year": 2021 },
                "price": 19500,
                "sellerId": "s2"
            },
            { "id": "c", "attributes": { "brand": "Honda", "model": "Civic" }, "sellerId": "s3" }
        ]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["background_worker"], false);
}

#[tokio::test]
async fn ingest_then_read_buckets() {
    let app = app();
    let (status, body) = send(&app, Method::PUT, "/api/v1/listings", Some(listings_body())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);

    let (status, body) = send(&app, Method::GET, "/api/v1/buckets?per_page=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_listings"], 3);
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["data"][0]["count"], 2);
    assert_eq!(body["data"][0]["minPrice"], 19500.0);
    assert_eq!(body["data"][0]["maxPrice"], 21000.0);
}

#[tokio::test]
async fn listings_endpoint_reports_freshness() {
    let app = app();
    let (_, empty) = send(&app, Method::GET, "/api/v1/listings", None).await;
    assert_eq!(empty["count"], 0);
    assert_eq!(empty["stale"], true);

    let _ = send(&app, Method::PUT, "/api/v1/listings", Some(listings_body())).await;
    let (_, body) = send(&app, Method::GET, "/api/v1/listings", None).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["stale"], false);
}

#[tokio::test]
async fn delete_cache_empties_everything() {
    let app = app();
    let _ = send(&app, Method::PUT, "/api/v1/listings", Some(listings_body())).await;
    let (status, _) = send(&app, Method::DELETE, "/api/v1/cache", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = send(&app, Method::GET, "/api/v1/buckets", None).await;
    assert_eq!(body["total_listings"], 0);
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn malformed_ingest_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/api/v1/listings",
        Some(serde_json::json!({ "listings": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
    let message = body["error"]["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("invalid request"));

    let (status, _) = send(&app, Method::GET, "/api/v1/listings", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bad_paging_parameters_are_rejected() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/api/v1/buckets?page=first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
}
