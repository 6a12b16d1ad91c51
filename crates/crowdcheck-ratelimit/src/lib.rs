//! Crowdcheck Rate Limit: per-identity request gate
//!
//! A fixed window per network identity: the first request opens a window,
//! up to `max_requests` are admitted inside it, and the first request after
//! it closes opens a new one. A periodic sweep drops windows nobody has
//! touched since they expired.
//!
//! Window state lives behind the [`WindowStore`] trait so it can move out
//! of process without touching callers.

pub mod limiter;
pub mod store;

pub use limiter::RateLimiter;
pub use store::{InMemoryWindowStore, WindowStore};

use chrono::{DateTime, Duration, Utc};
use crowdcheck_core::CrowdError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: i64,
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            sweep_interval_secs: 30 * 60,
        }
    }
}

impl RateLimitPolicy {
    pub fn validate(&self) -> Result<(), CrowdError> {
        if self.max_requests == 0 {
            return Err(CrowdError::Config(
                "rate limit max_requests must be at least 1".to_string(),
            ));
        }
        if self.window_secs <= 0 {
            return Err(CrowdError::Config(format!(
                "rate limit window_secs must be positive, got {}",
                self.window_secs
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(CrowdError::Config(
                "rate limit sweep_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RateDecision {
    Admitted { remaining: u32 },
    RateLimited { retry_after_seconds: u64 },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateDecision::Admitted { .. })
    }
}

/// Window for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindowState {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

impl RateWindowState {
    pub fn open(now: DateTime<Utc>, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 1,
            window_reset_at: now + policy.window(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_reset_at
    }

    /// Count one request against this window
    pub fn register(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateDecision {
        if self.is_expired(now) {
            *self = Self::open(now, policy);
        } else if self.count < policy.max_requests {
            self.count += 1;
        } else {
            let millis = (self.window_reset_at - now).num_milliseconds().max(0) as u64;
            let retry_after_seconds = ((millis + 999) / 1000).max(1);
            return RateDecision::RateLimited {
                retry_after_seconds,
            };
        }
        RateDecision::Admitted {
            remaining: policy.max_requests.saturating_sub(self.count),
        }
    }
}
