//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or malformed values fall back
//! to defaults, except `LISTEN_ADDR` which must parse when set.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;

/// Default number of member ids kept on each bucket.
pub const DEFAULT_BUCKET_ID_LIMIT: usize = 30;

/// Default listing count at which bucketing moves to the background unit.
pub const DEFAULT_WORKER_THRESHOLD: usize = 2_000;

/// Top-level configuration.
///
/// Loaded once at startup via [`CacheConfig::from_env`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// SQLite connection string for the durable tier. `None` means the
    /// environment has no durable store.
    pub database_url: Option<String>,

    /// Maximum number of SQLite connections in the pool.
    pub database_max_connections: u32,

    /// Directory for the file-backed fallback tier. `None` disables it.
    pub fallback_dir: Option<PathBuf>,

    /// Freshness window for the listing snapshot.
    pub listing_ttl: Duration,

    /// Freshness window for the bucket snapshot.
    pub bucket_ttl: Duration,

    /// Maximum number of vehicle ids recorded per bucket.
    pub bucket_id_limit: usize,

    /// Listing count at or above which bucketing is offloaded.
    pub worker_threshold: usize,

    /// Whether a background aggregation unit is started at all.
    pub worker_enabled: bool,

    /// Capacity of the storage-change broadcast channel.
    pub event_bus_capacity: usize,
}

impl CacheConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let durable_enabled = parse_env_bool("DURABLE_STORE_ENABLED", true);
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://listing-cache.db".to_string());
        let database_url = non_empty(database_url).filter(|_| durable_enabled);

        let fallback_dir = non_empty(
            std::env::var("FALLBACK_STORE_DIR").unwrap_or_else(|_| ".listing-cache".to_string()),
        )
        .map(PathBuf::from);

        let default_ttl_secs = DEFAULT_TTL.as_secs();

        Ok(Self {
            listen_addr,
            database_url,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 4),
            fallback_dir,
            listing_ttl: Duration::from_secs(parse_env("LISTING_TTL_SECS", default_ttl_secs)),
            bucket_ttl: Duration::from_secs(parse_env("BUCKET_TTL_SECS", default_ttl_secs)),
            bucket_id_limit: parse_env("BUCKET_ID_LIMIT", DEFAULT_BUCKET_ID_LIMIT),
            worker_threshold: parse_env("WORKER_THRESHOLD", DEFAULT_WORKER_THRESHOLD),
            worker_enabled: parse_env_bool("WORKER_ENABLED", true),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", 1_024),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("TRUE") | Some("1") => true,
        Some("false") | Some("FALSE") | Some("0") => false,
        _ => default,
    }
}
