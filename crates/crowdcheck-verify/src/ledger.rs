//! Check ledger: append-only accumulation of scoring checks
use crowdcheck_core::{Admission, TrustScore, VerificationCheck, VerificationResult};

/// Builder that collects checks and warnings by value, then folds them
/// into a [`VerificationResult`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckLedger {
    checks: Vec<VerificationCheck>,
    warnings: Vec<String>,
}

impl CheckLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, check: VerificationCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Append another ledger's entries after this one's
    pub fn merge(mut self, other: CheckLedger) -> Self {
        self.checks.extend(other.checks);
        self.warnings.extend(other.warnings);
        self
    }

    pub fn checks(&self) -> &[VerificationCheck] {
        &self.checks
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Sum of check points, before any trust adjustment
    pub fn points(&self) -> i32 {
        self.checks.iter().map(|c| c.points as i32).sum()
    }

    pub fn finish(
        self,
        trust: TrustScore,
        trust_adjustment: i32,
        auto_verify_at: i32,
        review_at: i32,
    ) -> VerificationResult {
        let score = self.points() + trust_adjustment;
        VerificationResult {
            score,
            admission: Admission::with_thresholds(score, auto_verify_at, review_at),
            checks: self.checks,
            warnings: self.warnings,
            trust,
            trust_adjustment,
        }
    }
}
