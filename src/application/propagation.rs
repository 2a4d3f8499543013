//! Bounded fire-and-forget propagation to the secondary stores.
//!
//! Each propagation runs as a detached tokio task holding one semaphore
//! permit. When no permit is free the propagation is dropped and counted;
//! delivery is at most once and nothing is retried.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::entities::PostId;

pub const DEFAULT_MAX_IN_FLIGHT: u32 = 256;

const METRIC_PROPAGATION_DISPATCHED: &str = "trellis_propagation_dispatched_total";
const METRIC_PROPAGATION_FAILED: &str = "trellis_propagation_failed_total";
const METRIC_PROPAGATION_DROPPED: &str = "trellis_propagation_dropped_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationTarget {
    Cache,
    Index,
}

impl PropagationTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            PropagationTarget::Cache => "cache",
            PropagationTarget::Index => "index",
        }
    }
}

#[derive(Clone)]
pub struct Propagator {
    permits: Arc<Semaphore>,
    max_in_flight: u32,
}

impl Propagator {
    pub fn new(max_in_flight: u32) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight
    }

    pub fn in_flight(&self) -> usize {
        (self.max_in_flight as usize).saturating_sub(self.permits.available_permits())
    }

    /// Spawn `task` without waiting for it. Returns `false` when the
    /// propagation was dropped because the in-flight bound was reached.
    pub fn dispatch<F, E>(
        &self,
        target: PropagationTarget,
        operation: &'static str,
        post_id: PostId,
        task: F,
    ) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Ok(permit) = self.permits.clone().try_acquire_owned() else {
            counter!(METRIC_PROPAGATION_DROPPED, "target" => target.as_str()).increment(1);
            warn!(
                target = "trellis::propagation",
                store = target.as_str(),
                operation,
                post_id,
                max_in_flight = self.max_in_flight,
                "propagation dropped: in-flight limit reached"
            );
            return false;
        };

        counter!(METRIC_PROPAGATION_DISPATCHED, "target" => target.as_str()).increment(1);
        tokio::spawn(async move {
            let _permit = permit;
            match task.await {
                Ok(()) => debug!(
                    target = "trellis::propagation",
                    store = target.as_str(),
                    operation,
                    post_id,
                    "propagation applied"
                ),
                Err(err) => {
                    counter!(METRIC_PROPAGATION_FAILED, "target" => target.as_str())
                        .increment(1);
                    warn!(
                        target = "trellis::propagation",
                        store = target.as_str(),
                        operation,
                        post_id,
                        error = %err,
                        "propagation failed"
                    );
                }
            }
        });
        true
    }

    /// Wait until every dispatched propagation has finished.
    ///
    /// Call only once no further work will be dispatched, e.g. after the HTTP
    /// server stopped. While this waits it queues for every permit, so
    /// `dispatch` drops new work and `in_flight` overstates what is pending.
    /// Permits are handed back when it returns.
    pub async fn wait_idle(&self) {
        if let Ok(all) = self.permits.acquire_many(self.max_in_flight).await {
            drop(all);
        }
    }
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IN_FLIGHT)
    }
}
