//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::BucketService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Listing and bucket orchestration.
    pub bucket_service: Arc<BucketService>,
    /// Storage-change events for WebSocket subscribers.
    pub event_bus: EventBus,
}
