//! Background execution of the bucketing engine.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::messages::{WorkerRequest, WorkerResponse};
use super::policy::{DispatchPolicy, ThresholdPolicy};
use crate::bucketing::bucket;
use crate::config::CacheConfig;
use crate::domain::{Bucket, Listing};
use crate::error::CacheError;

const THREAD_NAME: &str = "bucketing-worker";

/// One request in flight, paired with the channel its answer goes to.
#[derive(Debug)]
struct Envelope {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Handle to the dedicated background thread.
///
/// The thread drains its queue one envelope at a time, so requests from
/// concurrent callers queue up and each reply goes only to its own caller.
/// Dropping the handle closes the queue and the thread exits.
#[derive(Debug)]
struct BackgroundUnit {
    sender: mpsc::UnboundedSender<Envelope>,
}

impl BackgroundUnit {
    fn start() -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Envelope>();
        std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(Envelope { request, reply }) = receiver.blocking_recv() {
                    let kind = request.type_str();
                    if reply.send(request.handle()).is_err() {
                        tracing::debug!(kind, "requester gone before response");
                    }
                }
                tracing::debug!("bucketing worker stopped");
            })?;
        Ok(Self { sender })
    }
}

/// Counters describing how bucketing requests were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Requests the policy kept on the caller's thread.
    pub inline_runs: u64,
    /// Requests answered by the background unit.
    pub offloaded_runs: u64,
    /// Requests meant for the background unit that ran inline instead.
    pub fallbacks: u64,
}

/// Runs the bucketing engine inline or on a background thread.
///
/// Every request ends in a bucket list: when the background unit is
/// missing, dead, or answers with the wrong message type, the engine runs
/// inline.
pub struct AggregationWorker {
    policy: Arc<dyn DispatchPolicy>,
    unit: Option<BackgroundUnit>,
    inline_runs: AtomicU64,
    offloaded_runs: AtomicU64,
    fallbacks: AtomicU64,
}

impl fmt::Debug for AggregationWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationWorker")
            .field("policy", &self.policy)
            .field("background", &self.unit.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}

impl AggregationWorker {
    /// Starts a background unit governed by `policy`.
    ///
    /// If the thread cannot be spawned the worker still works, inline only.
    #[must_use]
    pub fn spawn(policy: impl DispatchPolicy + 'static) -> Self {
        let unit = match BackgroundUnit::start() {
            Ok(unit) => Some(unit),
            Err(err) => {
                tracing::warn!(%err, "background bucketing unavailable, running inline");
                None
            }
        };
        Self::with_unit(Arc::new(policy), unit)
    }

    /// A worker without any background unit.
    #[must_use]
    pub fn inline_only(policy: impl DispatchPolicy + 'static) -> Self {
        Self::with_unit(Arc::new(policy), None)
    }

    /// Builds the worker described by `config`.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let policy = ThresholdPolicy::new(config.worker_threshold);
        if config.worker_enabled {
            Self::spawn(policy)
        } else {
            Self::inline_only(policy)
        }
    }

    fn with_unit(policy: Arc<dyn DispatchPolicy>, unit: Option<BackgroundUnit>) -> Self {
        Self {
            policy,
            unit,
            inline_runs: AtomicU64::new(0),
            offloaded_runs: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Returns `true` if a background unit was started.
    #[must_use]
    pub fn has_background_unit(&self) -> bool {
        self.unit.is_some()
    }

    /// Groups `listings` into buckets, off-thread when the policy says so.
    pub async fn run_bucketing(&self, listings: &[Listing], id_limit: usize) -> Vec<Bucket> {
        if !self.policy.should_offload(listings.len()) {
            self.inline_runs.fetch_add(1, Ordering::Relaxed);
            return bucket(listings, id_limit);
        }

        let request = WorkerRequest::Bucket {
            listings: listings.to_vec(),
            limit: id_limit,
        };
        match self.round_trip(request).await {
            Ok(WorkerResponse::BucketResult { buckets }) => {
                self.offloaded_runs.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    listings = listings.len(),
                    buckets = buckets.len(),
                    "bucketing done in background"
                );
                buckets
            }
            Ok(other) => {
                tracing::warn!(response = ?other, "unexpected worker response, bucketing inline");
                self.fallback(listings, id_limit)
            }
            Err(err) => {
                tracing::warn!(%err, "bucketing inline");
                self.fallback(listings, id_limit)
            }
        }
    }

    /// Sends a liveness check; `true` when the background unit answers.
    pub async fn ping(&self) -> bool {
        matches!(
            self.round_trip(WorkerRequest::Ping).await,
            Ok(WorkerResponse::Pong)
        )
    }

    /// Snapshot of the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            inline_runs: self.inline_runs.load(Ordering::Relaxed),
            offloaded_runs: self.offloaded_runs.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }

    fn fallback(&self, listings: &[Listing], id_limit: usize) -> Vec<Bucket> {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        bucket(listings, id_limit)
    }

    async fn round_trip(&self, request: WorkerRequest) -> Result<WorkerResponse, CacheError> {
        let Some(unit) = &self.unit else {
            return Err(CacheError::WorkerUnavailable(
                "no background unit".to_string(),
            ));
        };
        let (reply, response) = oneshot::channel();
        unit.sender
            .send(Envelope { request, reply })
            .map_err(|_| CacheError::WorkerUnavailable("background unit stopped".to_string()))?;
        response
            .await
            .map_err(|_| {
                CacheError::WorkerUnavailable("background unit dropped the request".to_string())
            })
    }
}
