//! Injectable inline-vs-background dispatch decision.

use std::fmt;

use crate::config::DEFAULT_WORKER_THRESHOLD;

/// Decides whether a bucketing request of `len` listings leaves the caller's
/// thread.
pub trait DispatchPolicy: Send + Sync + fmt::Debug {
    /// `true` to send the work to the background unit.
    fn should_offload(&self, len: usize) -> bool;
}

/// Offloads at or above a fixed listing count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// Smallest listing count that is offloaded.
    pub threshold: usize,
}

impl ThresholdPolicy {
    /// Creates a policy with the given threshold.
    #[must_use]
    pub const fn new(threshold: usize) -> Self {
        Self { threshold }
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_THRESHOLD)
    }
}

impl DispatchPolicy for ThresholdPolicy {
    fn should_offload(&self, len: usize) -> bool {
        len >= self.threshold
    }
}

/// Never offloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysInline;

impl DispatchPolicy for AlwaysInline {
    fn should_offload(&self, _len: usize) -> bool {
        false
    }
}

/// Always offloads, whatever the size.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOffload;

impl DispatchPolicy for AlwaysOffload {
    fn should_offload(&self, _len: usize) -> bool {
        true
    }
}
