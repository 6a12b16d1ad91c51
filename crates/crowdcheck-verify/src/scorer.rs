//! Verification engine: the single entry point per submission
//!
//! ```text
//! submission → duplicate check ─┬─ duplicate → DuplicateRejected
//!                               └─ clear → content checks + weather match
//!                                              ↓
//!                                     sum points + trust adjustment
//!                                              ↓
//!                                  auto_verified / pending_review / flagged
//! ```
//!
//! Evaluation owns no locks. Dropping the returned future cancels any
//! in-flight weather lookup and leaves nothing behind.

use crowdcheck_core::{
    Clock, HistoryStore, ReportAnnotations, ReportSubmission, VerificationResult,
    WeatherProvider,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::content::ContentChecker;
use crate::duplicate::DuplicateDetector;
use crate::profile::EngineProfile;
use crate::trust::TrustEstimator;
use crate::weather_match::WeatherCrossValidator;

/// A scored submission ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedReport {
    pub result: VerificationResult,
    pub annotations: ReportAnnotations,
}

/// Outcome of [`VerificationEngine::evaluate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Evaluation {
    Accepted(AcceptedReport),
    DuplicateRejected { reason: String },
}

impl Evaluation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Evaluation::Accepted(_))
    }

    pub fn accepted(&self) -> Option<&AcceptedReport> {
        match self {
            Evaluation::Accepted(report) => Some(report),
            Evaluation::DuplicateRejected { .. } => None,
        }
    }
}

pub struct VerificationEngine {
    profile: EngineProfile,
    content: ContentChecker,
    weather: WeatherCrossValidator,
    duplicates: DuplicateDetector,
    trust: TrustEstimator,
}

impl VerificationEngine {
    pub fn new(
        profile: EngineProfile,
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn WeatherProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content: ContentChecker::new(&profile),
            weather: WeatherCrossValidator::new(&profile, provider, clock.clone()),
            duplicates: DuplicateDetector::new(&profile, history.clone(), clock),
            trust: TrustEstimator::new(&profile, history),
            profile,
        }
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    /// Duplicate check, then scoring
    pub async fn evaluate(&self, submission: &ReportSubmission) -> Evaluation {
        let verdict = self.duplicates.check(submission).await;
        if verdict.is_duplicate {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "duplicate report".to_string());
            return Evaluation::DuplicateRejected { reason };
        }
        Evaluation::Accepted(self.score(submission).await)
    }

    /// Scoring without the duplicate gate
    pub async fn score(&self, submission: &ReportSubmission) -> AcceptedReport {
        let content = self.content.check(submission);
        let weather = self
            .weather
            .validate(&submission.description, submission.coordinates)
            .await;

        let ledger = weather.ledger.merge(content.ledger);
        let trust = self
            .trust
            .estimate(submission.network_identity.as_deref())
            .await;
        let adjustment = self.trust.adjustment_for(trust);

        let result = ledger.finish(
            trust,
            adjustment,
            self.profile.auto_verify_at,
            self.profile.review_at,
        );

        let (network_identity, client_signature) = match content.authenticity {
            Some((identity, signature)) => (Some(identity), Some(signature)),
            None => (None, None),
        };

        tracing::info!(
            score = result.score,
            admission = %result.admission,
            trust = trust.value(),
            "report scored"
        );

        AcceptedReport {
            result,
            annotations: ReportAnnotations {
                weather_at_time: weather.snapshot,
                network_identity,
                client_signature,
            },
        }
    }
}
