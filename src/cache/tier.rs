//! Per-tier outcomes and the diagnostic hook for swallowed failures.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::CacheError;

/// Storage tier of a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Process memory.
    Memory,
    /// Durable key-value store.
    Durable,
    /// Fallback string store.
    Fallback,
}

/// Operation attempted against a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierOperation {
    /// Lookup of the snapshot key.
    Read,
    /// Write-through of a new snapshot.
    Write,
    /// Removal during a clear.
    Delete,
}

/// Result of one tier attempt.
///
/// `Failed` is reported and then handled exactly like `Miss`.
#[derive(Debug)]
pub enum TierOutcome<T> {
    /// The tier held a usable value.
    Hit(T),
    /// The tier held nothing.
    Miss,
    /// The tier failed or held an undecodable value.
    Failed(CacheError),
}

impl<T> TierOutcome<T> {
    /// Maps a raw tier lookup onto an outcome, decoding hits with `decode`.
    pub fn from_lookup<V, F>(lookup: Result<Option<V>, CacheError>, decode: F) -> Self
    where
        F: FnOnce(V) -> Result<T, CacheError>,
    {
        match lookup {
            Ok(Some(raw)) => match decode(raw) {
                Ok(value) => Self::Hit(value),
                Err(err) => Self::Failed(err),
            },
            Ok(None) => Self::Miss,
            Err(err) => Self::Failed(err),
        }
    }

    /// Returns `true` for [`TierOutcome::Hit`].
    #[must_use]
    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// A swallowed tier failure, as seen by a [`DiagnosticHook`].
#[derive(Debug)]
pub struct TierDiagnostic<'a> {
    /// Storage key of the cache that saw the failure.
    pub key: &'static str,
    /// Tier that failed.
    pub tier: Tier,
    /// What was being attempted.
    pub operation: TierOperation,
    /// The underlying error.
    pub error: &'a CacheError,
}

type HookFn = dyn Fn(&TierDiagnostic<'_>) + Send + Sync;

/// Optional observer of tier failures that the caches swallow.
#[derive(Clone)]
pub struct DiagnosticHook(Arc<HookFn>);

impl DiagnosticHook {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&TierDiagnostic<'_>) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub(crate) fn emit(&self, diagnostic: &TierDiagnostic<'_>) {
        (self.0)(diagnostic);
    }
}

impl fmt::Debug for DiagnosticHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiagnosticHook(..)")
    }
}
