//! Shared handler state
use crowdcheck_core::{Clock, HistoryStore, WeatherProvider};
use crowdcheck_ratelimit::{RateLimitPolicy, RateLimiter};
use crowdcheck_verify::{AuditLog, EngineProfile, VerificationEngine};
use std::sync::{Arc, Mutex};

use crate::events::EventBus;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<VerificationEngine>,
    pub limiter: Arc<RateLimiter>,
    pub history: Arc<dyn HistoryStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<Mutex<AuditLog>>,
    pub metrics: Arc<Metrics>,
    pub events: EventBus,
    pub trust_proxy: bool,
}

impl AppState {
    /// Wire the engine and limiter over shared collaborators
    pub fn new(
        profile: EngineProfile,
        policy: RateLimitPolicy,
        history: Arc<dyn HistoryStore>,
        weather: Arc<dyn WeatherProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, prometheus::Error> {
        let engine = VerificationEngine::new(
            profile,
            history.clone(),
            weather.clone(),
            clock.clone(),
        );
        let limiter = RateLimiter::new(
            policy,
            Arc::new(crowdcheck_ratelimit::InMemoryWindowStore::new()),
            clock.clone(),
        );
        Ok(Self {
            engine: Arc::new(engine),
            limiter: Arc::new(limiter),
            history,
            weather,
            clock,
            audit: Arc::new(Mutex::new(AuditLog::new())),
            metrics: Arc::new(Metrics::new()?),
            events: EventBus::default(),
            trust_proxy: false,
        })
    }

    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = trust;
        self
    }
}
