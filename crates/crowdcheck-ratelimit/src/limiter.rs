//! Rate limiter over an injected window store and clock
use crowdcheck_core::{Clock, SystemClock};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::store::{InMemoryWindowStore, WindowStore};
use crate::{RateDecision, RateLimitPolicy};

pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    clock: Arc<dyn Clock>,
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(
        policy: RateLimitPolicy,
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// In-memory store on the system clock
    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::new(policy, Arc::new(InMemoryWindowStore::new()), Arc::new(SystemClock))
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn WindowStore> {
        &self.store
    }

    pub fn admit(&self, identity: &str) -> RateDecision {
        let decision = self.store.hit(identity, self.clock.now(), &self.policy);
        if let RateDecision::RateLimited {
            retry_after_seconds,
        } = decision
        {
            tracing::warn!(%identity, retry_after_seconds, "rate limit exceeded");
        }
        decision
    }

    pub fn sweep(&self) -> usize {
        let removed = self.store.sweep(self.clock.now());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.store.len(), "rate limit sweep");
        }
        removed
    }

    /// Run [`sweep`](Self::sweep) every `sweep_interval` until the handle is aborted
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        // interval panics on a zero period
        let period = limiter
            .policy
            .sweep_interval()
            .max(std::time::Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        tokio::spawn(async move {
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}
