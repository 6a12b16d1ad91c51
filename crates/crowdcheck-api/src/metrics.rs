//! Prometheus counters served at `/metrics`
use crowdcheck_core::Admission;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    evaluations: IntCounterVec,
    duplicates: IntCounter,
    rate_limited: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let evaluations = IntCounterVec::new(
            Opts::new(
                "crowdcheck_evaluations_total",
                "Scored reports by admission tier",
            ),
            &["admission"],
        )?;
        let duplicates = IntCounter::new(
            "crowdcheck_duplicates_total",
            "Reports rejected by the duplicate detector",
        )?;
        let rate_limited = IntCounter::new(
            "crowdcheck_rate_limited_total",
            "Requests rejected by the rate limiter",
        )?;

        registry.register(Box::new(evaluations.clone()))?;
        registry.register(Box::new(duplicates.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;

        Ok(Self {
            registry,
            evaluations,
            duplicates,
            rate_limited,
        })
    }

    pub fn record_evaluation(&self, admission: Admission) {
        self.evaluations
            .with_label_values(&[admission.as_str()])
            .inc();
    }

    pub fn record_duplicate(&self) {
        self.duplicates.inc();
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
