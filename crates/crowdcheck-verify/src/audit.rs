//! Audit trail of verification decisions
//!
//! Keeps a bounded, in-order record of every evaluation for moderators and
//! debugging. Report text is not stored, only a blake3 fingerprint of it.

use chrono::{DateTime, Utc};
use crowdcheck_core::{Admission, ReportSubmission};
use serde::{Deserialize, Serialize};

use crate::scorer::Evaluation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub event_type: AuditEventType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_identity: Option<String>,

    /// `blake3:<hex>` over description and location
    pub fingerprint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admission: Option<Admission>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust: Option<u32>,

    /// "<check>: <status> +<points>"
    #[serde(default)]
    pub checks: Vec<String>,

    #[serde(default)]
    pub warnings: Vec<String>,

    /// Rejection reason for duplicates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEntry {
    pub fn from_evaluation(
        submission: &ReportSubmission,
        evaluation: &Evaluation,
        at: DateTime<Utc>,
    ) -> Self {
        let base = Self {
            id: generate_audit_id(at),
            timestamp: at,
            event_type: AuditEventType::Evaluation,
            network_identity: submission.network_identity.clone(),
            fingerprint: fingerprint(submission),
            score: None,
            admission: None,
            trust: None,
            checks: Vec::new(),
            warnings: Vec::new(),
            reason: None,
        };

        match evaluation {
            Evaluation::Accepted(accepted) => {
                let result = &accepted.result;
                Self {
                    score: Some(result.score),
                    admission: Some(result.admission),
                    trust: Some(result.trust.value()),
                    checks: result
                        .checks
                        .iter()
                        .map(|c| format!("{}: {:?} +{}", c.name, c.status, c.points))
                        .collect(),
                    warnings: result.warnings.clone(),
                    ..base
                }
            }
            Evaluation::DuplicateRejected { reason } => Self {
                event_type: AuditEventType::DuplicateRejected,
                reason: Some(reason.clone()),
                ..base
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    Evaluation,
    DuplicateRejected,
}

pub struct AuditLog {
    entries: Vec<AuditEntry>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(10_000)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: max,
        }
    }

    pub fn log(&mut self, entry: AuditEntry) {
        self.entries.push(entry);

        if self.entries.len() > self.max_entries {
            let drain_count = self.entries.len() - self.max_entries;
            self.entries.drain(0..drain_count);
        }
    }

    /// Log an evaluation, returning the entry id
    pub fn log_evaluation(
        &mut self,
        submission: &ReportSubmission,
        evaluation: &Evaluation,
        at: DateTime<Utc>,
    ) -> String {
        let entry = AuditEntry::from_evaluation(submission, evaluation, at);
        let id = entry.id.clone();
        self.log(entry);
        id
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn entries_for_identity(&self, identity: &str) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.network_identity.as_deref() == Some(identity))
            .collect()
    }

    pub fn flagged_entries(&self) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.admission == Some(Admission::Flagged))
            .collect()
    }

    pub fn to_jsonl(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn stats(&self) -> AuditStats {
        let count = |tier: Admission| {
            self.entries
                .iter()
                .filter(|e| e.admission == Some(tier))
                .count()
        };
        let total = self.entries.len();
        let flagged = count(Admission::Flagged);
        let duplicates = self
            .entries
            .iter()
            .filter(|e| e.event_type == AuditEventType::DuplicateRejected)
            .count();

        AuditStats {
            total,
            auto_verified: count(Admission::AutoVerified),
            pending_review: count(Admission::PendingReview),
            flagged,
            duplicates,
            flag_rate: if total > 0 { flagged as f64 / total as f64 } else { 0.0 },
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub auto_verified: usize,
    pub pending_review: usize,
    pub flagged: usize,
    pub duplicates: usize,
    pub flag_rate: f64,
}

pub fn fingerprint(submission: &ReportSubmission) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(submission.description.as_bytes());
    hasher.update(b"\n");
    hasher.update(submission.location.as_bytes());
    format!("blake3:{}", hasher.finalize())
}

fn generate_audit_id(at: DateTime<Utc>) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("aud_{:x}_{:04x}", at.timestamp_millis(), counter % 0xFFFF)
}
