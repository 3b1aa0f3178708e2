//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The endpoint at `/ws` streams storage-change events for the cache keys a
//! client subscribes to, and accepts storage-change signals from other
//! processes sharing the same stores.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
