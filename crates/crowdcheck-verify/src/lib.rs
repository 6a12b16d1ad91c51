//! Crowdcheck Verify: trust and verification for crowd reports
//!
//! Decides whether an anonymous weather report is auto-published, queued
//! for review or flagged. Every external signal degrades to a conservative
//! default, so an evaluation always produces a result.
//!
//! # Example
//!
//! ```ignore
//! use crowdcheck_verify::{VerificationEngine, EngineProfile, Evaluation};
//!
//! let engine = VerificationEngine::new(EngineProfile::default(), history, provider, clock);
//!
//! match engine.evaluate(&submission).await {
//!     Evaluation::Accepted(report) => {
//!         println!("{}", report.result.summary());
//!     }
//!     Evaluation::DuplicateRejected { reason } => {
//!         println!("rejected: {}", reason);
//!     }
//! }
//! ```

pub mod audit;
pub mod content;
pub mod duplicate;
pub mod ledger;
pub mod profile;
pub mod scorer;
pub mod trust;
pub mod weather_match;

pub use audit::{AuditEntry, AuditEventType, AuditLog, AuditStats};
pub use content::{ContentChecker, ContentOutcome};
pub use duplicate::{DuplicateDetector, AREA_CLUSTER_REASON, IDENTITY_FLOOD_REASON};
pub use ledger::CheckLedger;
pub use profile::EngineProfile;
pub use scorer::{AcceptedReport, Evaluation, VerificationEngine};
pub use trust::TrustEstimator;
pub use weather_match::{find_match, MatchRule, MatchThresholds, WeatherCrossValidator};
