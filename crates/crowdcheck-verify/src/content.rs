//! Content plausibility checks
//!
//! Pure lexical and structural checks over the submitted text. No I/O.

use crowdcheck_core::{CheckName, ReportSubmission, VerificationCheck};

use crate::ledger::CheckLedger;
use crate::profile::EngineProfile;

/// Output of the content checks
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOutcome {
    pub ledger: CheckLedger,
    /// Identity and signature recorded by the authenticity check
    pub authenticity: Option<(String, String)>,
}

pub struct ContentChecker {
    min_chars: usize,
    max_chars: usize,
    suspicious_tokens: Vec<String>,
    quality_points: u32,
    content_points: u32,
    timestamp_points: u32,
    authenticity_points: u32,
}

impl ContentChecker {
    pub fn new(profile: &EngineProfile) -> Self {
        Self {
            min_chars: profile.min_description_chars,
            max_chars: profile.max_description_chars,
            suspicious_tokens: profile
                .suspicious_tokens
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            quality_points: profile.quality_points,
            content_points: profile.content_points,
            timestamp_points: profile.timestamp_points,
            authenticity_points: profile.authenticity_points,
        }
    }

    pub fn check(&self, submission: &ReportSubmission) -> ContentOutcome {
        let ledger = CheckLedger::new();
        let ledger = self.check_length(ledger, &submission.description);
        let ledger = self.check_suspicious(ledger, &submission.description, &submission.location);
        let ledger = ledger.record(VerificationCheck::passed(
            CheckName::TimestampValid,
            self.timestamp_points,
        ));

        let identity = submission.network_identity.as_deref().filter(|s| !s.is_empty());
        let signature = submission.client_signature.as_deref().filter(|s| !s.is_empty());
        match (identity, signature) {
            (Some(identity), Some(signature)) => ContentOutcome {
                ledger: ledger.record(VerificationCheck::passed(
                    CheckName::RequestAuthenticity,
                    self.authenticity_points,
                )),
                authenticity: Some((identity.to_string(), signature.to_string())),
            },
            _ => ContentOutcome {
                ledger,
                authenticity: None,
            },
        }
    }

    fn check_length(&self, ledger: CheckLedger, description: &str) -> CheckLedger {
        let chars = description.chars().count();
        if chars < self.min_chars {
            ledger
                .record(VerificationCheck::failed(CheckName::ReportQuality))
                .warn(format!(
                    "Report description too short (minimum {} characters)",
                    self.min_chars
                ))
        } else if chars <= self.max_chars {
            ledger.record(VerificationCheck::passed(
                CheckName::ReportQuality,
                self.quality_points,
            ))
        } else {
            ledger
        }
    }

    fn check_suspicious(&self, ledger: CheckLedger, description: &str, location: &str) -> CheckLedger {
        let description = description.to_lowercase();
        let location = location.to_lowercase();
        let hit = self
            .suspicious_tokens
            .iter()
            .find(|t| location.contains(t.as_str()) || description.contains(t.as_str()));

        match hit {
            None => ledger.record(VerificationCheck::passed(
                CheckName::ContentValidity,
                self.content_points,
            )),
            Some(token) => {
                tracing::debug!(%token, "suspicious token in report");
                ledger
                    .record(VerificationCheck::failed(CheckName::ContentValidity))
                    .warn("Suspicious content detected")
            }
        }
    }
}

impl Default for ContentChecker {
    fn default() -> Self {
        Self::new(&EngineProfile::default())
    }
}
