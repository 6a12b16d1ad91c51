//! Window storage
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::{RateDecision, RateLimitPolicy, RateWindowState};

/// Owner of per-identity window state.
///
/// `hit` must be atomic per identity: concurrent hits for one identity
/// never lose or double-count a request.
pub trait WindowStore: Send + Sync {
    fn hit(&self, identity: &str, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateDecision;

    /// Drop windows that expired before `now`; returns how many went
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    fn state(&self, identity: &str) -> Option<RateWindowState>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store.
///
/// The outer map lock is only taken for writing to add an identity or to
/// sweep; hits on known identities share the read lock and serialize on
/// their own per-identity mutex.
#[derive(Debug, Default)]
pub struct InMemoryWindowStore {
    windows: RwLock<HashMap<String, Arc<Mutex<RateWindowState>>>>,
}

impl InMemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowStore for InMemoryWindowStore {
    fn hit(&self, identity: &str, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateDecision {
        {
            let windows = self.windows.read().unwrap_or_else(|e| e.into_inner());
            if let Some(window) = windows.get(identity) {
                let mut state = window.lock().unwrap_or_else(|e| e.into_inner());
                return state.register(now, policy);
            }
        }

        let mut windows = self.windows.write().unwrap_or_else(|e| e.into_inner());
        match windows.get(identity) {
            // Another request for this identity got the write lock first
            Some(window) => {
                let mut state = window.lock().unwrap_or_else(|e| e.into_inner());
                state.register(now, policy)
            }
            None => {
                windows.insert(
                    identity.to_string(),
                    Arc::new(Mutex::new(RateWindowState::open(now, policy))),
                );
                RateDecision::Admitted {
                    remaining: policy.max_requests.saturating_sub(1),
                }
            }
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut windows = self.windows.write().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, window| {
            let state = window.lock().unwrap_or_else(|e| e.into_inner());
            !state.is_expired(now)
        });
        before - windows.len()
    }

    fn state(&self, identity: &str) -> Option<RateWindowState> {
        let windows = self.windows.read().unwrap_or_else(|e| e.into_inner());
        windows
            .get(identity)
            .map(|w| *w.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn len(&self) -> usize {
        self.windows.read().map(|w| w.len()).unwrap_or(0)
    }
}
