//! End-to-end tests for the verification engine with in-memory collaborators.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use crowdcheck_core::{
    Admission, CheckName, CheckStatus, Conditions, Coordinates, GeoPoint, HistoryError,
    HistoryFilter, HistoryStore, ManualClock, MemoryHistory, ProviderError, ReportRecord,
    ReportSubmission, WeatherProvider,
};
use crowdcheck_verify::{EngineProfile, Evaluation, VerificationEngine, IDENTITY_FLOOD_REASON};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// Collaborators
// =============================================================================

struct FixedWeather {
    conditions: Option<Conditions>,
    calls: AtomicUsize,
}

impl FixedWeather {
    fn reporting(text: &str) -> Arc<Self> {
        Arc::new(Self {
            conditions: Some(Conditions {
                condition_text: text.to_string(),
                temperature_celsius: 22.0,
                wind_speed: 2.0,
                humidity: Some(70),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            conditions: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FixedWeather {
    async fn current_conditions(&self, _at: Coordinates) -> Result<Conditions, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.conditions
            .clone()
            .ok_or_else(|| ProviderError::Unreachable("offline".to_string()))
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        Err(ProviderError::NotFound(city.to_string()))
    }
}

struct DownHistory;

#[async_trait]
impl HistoryStore for DownHistory {
    async fn find_recent(
        &self,
        _filter: &HistoryFilter,
        _limit: Option<usize>,
    ) -> Result<Vec<ReportRecord>, HistoryError> {
        Err(HistoryError::Unavailable("mongo down".to_string()))
    }

    async fn insert(&self, _record: ReportRecord) -> Result<(), HistoryError> {
        Err(HistoryError::Unavailable("mongo down".to_string()))
    }
}

fn engine_with(
    history: Arc<dyn HistoryStore>,
    weather: Arc<FixedWeather>,
) -> VerificationEngine {
    VerificationEngine::new(
        EngineProfile::default(),
        history,
        weather,
        Arc::new(ManualClock::new(Utc::now())),
    )
}

/// Records from `identity`, all older than the duplicate window
fn track_record(identity: &str, verified: usize, total: usize) -> Vec<ReportRecord> {
    (0..total)
        .map(|i| {
            ReportRecord::new(
                "old report",
                "Karachi",
                Utc::now() - Duration::days(1) - Duration::minutes(i as i64),
            )
            .with_identity(identity)
            .verified(i < verified)
        })
        .collect()
}

fn accepted(evaluation: Evaluation) -> crowdcheck_verify::AcceptedReport {
    match evaluation {
        Evaluation::Accepted(report) => report,
        Evaluation::DuplicateRejected { reason } => panic!("unexpected rejection: {}", reason),
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_raining_report_is_auto_verified() {
    let weather = FixedWeather::reporting("light rain");
    let engine = engine_with(Arc::new(MemoryHistory::new()), weather.clone());

    let submission = ReportSubmission::new("It is raining heavily here", "Karachi")
        .with_coordinates(24.8607, 67.0011)
        .from_identity("203.0.113.5")
        .with_signature("Mozilla/5.0 (X11; Linux x86_64)");

    let report = accepted(engine.evaluate(&submission).await);
    let result = &report.result;

    assert_eq!(result.points_for(CheckName::GpsCoordinates), 20);
    assert_eq!(result.points_for(CheckName::WeatherConditionMatch), 30);
    assert_eq!(result.points_for(CheckName::ReportQuality), 15);
    assert_eq!(result.points_for(CheckName::ContentValidity), 15);
    assert_eq!(result.points_for(CheckName::TimestampValid), 10);
    assert_eq!(result.points_for(CheckName::RequestAuthenticity), 10);
    assert_eq!(result.trust.value(), 50);
    assert_eq!(result.score, 100);
    assert_eq!(result.admission, Admission::AutoVerified);
    assert!(result.warnings.is_empty());

    assert_eq!(weather.calls(), 1);
    assert_eq!(report.annotations.network_identity.as_deref(), Some("203.0.113.5"));
    assert_eq!(
        report.annotations.client_signature.as_deref(),
        Some("Mozilla/5.0 (X11; Linux x86_64)")
    );
    let snapshot = report.annotations.weather_at_time.unwrap();
    assert_eq!(snapshot.conditions.condition_text, "light rain");
}

#[tokio::test]
async fn test_junk_report_is_flagged() {
    let weather = FixedWeather::reporting("light rain");
    let engine = engine_with(Arc::new(MemoryHistory::new()), weather.clone());

    for submission in [
        ReportSubmission::new("asdf", "Karachi"),
        ReportSubmission::new("asdf", "Karachi")
            .from_identity("203.0.113.5")
            .with_signature("curl/8.0"),
    ] {
        let result = accepted(engine.evaluate(&submission).await).result;

        assert_eq!(result.points_for(CheckName::GpsCoordinates), 0);
        assert!(result.check(CheckName::WeatherConditionMatch).is_none());
        assert_eq!(result.points_for(CheckName::ReportQuality), 0);
        assert_eq!(result.points_for(CheckName::ContentValidity), 0);
        assert_eq!(result.points_for(CheckName::TimestampValid), 10);
        assert!(result.score <= 20);
        assert_eq!(result.admission, Admission::Flagged);
        assert!(result.warnings.iter().any(|w| w.contains("too short")));
        assert!(result.warnings.iter().any(|w| w.contains("Suspicious")));
    }
    assert_eq!(weather.calls(), 0);
}

#[tokio::test]
async fn test_trust_adjustment_is_exactly_ten() {
    let weather = FixedWeather::reporting("overcast clouds");
    let mut records = track_record("trusted", 9, 10);
    records.extend(track_record("shaky", 1, 10));
    let engine = engine_with(Arc::new(MemoryHistory::with_records(records)), weather);

    let base = |identity: &str| {
        ReportSubmission::new("Dark clouds gathering over the city", "Lahore")
            .with_coordinates(31.52, 74.35)
            .from_identity(identity)
            .with_signature("Mozilla/5.0")
    };

    let neutral = accepted(engine.evaluate(&base("newcomer")).await).result;
    let trusted = accepted(engine.evaluate(&base("trusted")).await).result;
    let shaky = accepted(engine.evaluate(&base("shaky")).await).result;

    assert_eq!(neutral.trust_adjustment, 0);
    assert_eq!(trusted.trust.value(), 90);
    assert_eq!(trusted.score, neutral.score + 10);
    assert_eq!(shaky.trust.value(), 10);
    assert_eq!(shaky.score, neutral.score - 10);
}

#[tokio::test]
async fn test_flooding_identity_rejected_before_scoring() {
    let weather = FixedWeather::reporting("light rain");
    let now = Utc::now();
    let records = (0..3)
        .map(|i| {
            ReportRecord::new("rain", "Karachi", now - Duration::minutes(i * 5))
                .with_identity("198.51.100.1")
        })
        .collect();
    let engine = engine_with(Arc::new(MemoryHistory::with_records(records)), weather.clone());

    let submission = ReportSubmission::new("It is raining heavily here", "Karachi")
        .with_coordinates(24.86, 67.0)
        .from_identity("198.51.100.1");

    match engine.evaluate(&submission).await {
        Evaluation::DuplicateRejected { reason } => assert_eq!(reason, IDENTITY_FLOOD_REASON),
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(weather.calls(), 0);
}

#[tokio::test]
async fn test_every_dependency_down_still_produces_result() {
    let weather = FixedWeather::offline();
    let engine = engine_with(Arc::new(DownHistory), weather.clone());

    let submission = ReportSubmission::new("Strong winds tearing down signboards", "Karachi")
        .with_coordinates(24.86, 67.0)
        .from_identity("198.51.100.1")
        .with_signature("Mozilla/5.0");

    let report = accepted(engine.evaluate(&submission).await);
    let result = report.result;

    assert_eq!(weather.calls(), 1);
    let weather_check = result.check(CheckName::WeatherConditionMatch).unwrap();
    assert_eq!(weather_check.status, CheckStatus::Error);
    assert_eq!(weather_check.points, 0);
    assert_eq!(result.trust.value(), 50);
    // 20 gps + 15 quality + 15 content + 10 timestamp + 10 authenticity
    assert_eq!(result.score, 70);
    assert_eq!(result.admission, Admission::AutoVerified);
    assert!(report.annotations.weather_at_time.is_none());
}

#[tokio::test]
async fn test_mismatched_weather_gets_review() {
    let weather = FixedWeather::reporting("clear sky");
    let engine = engine_with(Arc::new(MemoryHistory::new()), weather);

    let submission = ReportSubmission::new("Hail the size of marbles falling", "Quetta")
        .with_coordinates(30.18, 66.99);

    let result = accepted(engine.evaluate(&submission).await).result;
    // 20 gps + 10 partial + 15 quality + 15 content + 10 timestamp
    assert_eq!(result.score, 70);
    assert_eq!(
        result.check(CheckName::WeatherConditionMatch).unwrap().status,
        CheckStatus::Partial
    );

    let submission = ReportSubmission::new("Hail the size of marbles falling", "Quetta")
        .with_coordinates(30.18, 66.99)
        .from_identity("192.0.2.44");
    let engine = engine_with(
        Arc::new(MemoryHistory::with_records(track_record("192.0.2.44", 0, 4))),
        FixedWeather::reporting("clear sky"),
    );
    let result = accepted(engine.evaluate(&submission).await).result;
    assert_eq!(result.score, 60);
    assert_eq!(result.admission, Admission::PendingReview);
}
