//! Data Model: ReportSubmission, VerificationResult, ReportRecord
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::weather::Conditions;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Inbound observation, as handed to the engine by the submission workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSubmission {
    /// Free-text description of what the reporter observes
    pub description: String,
    /// Free-text location label (e.g. a city name)
    pub location: String,
    /// GPS position, when the client shared one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Source address of the submitter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_identity: Option<String>,
    /// Client user-agent string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature: Option<String>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl ReportSubmission {
    pub fn new(description: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            location: location.into(),
            coordinates: None,
            network_identity: None,
            client_signature: None,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn from_identity(mut self, identity: impl Into<String>) -> Self {
        self.network_identity = Some(identity.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.client_signature = Some(signature.into());
        self
    }

    pub fn at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }
}

/// Name of a scoring check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckName {
    #[serde(rename = "GPS Coordinates")]
    GpsCoordinates,
    #[serde(rename = "Weather Condition Match")]
    WeatherConditionMatch,
    #[serde(rename = "Report Quality")]
    ReportQuality,
    #[serde(rename = "Content Validity")]
    ContentValidity,
    #[serde(rename = "Timestamp Valid")]
    TimestampValid,
    #[serde(rename = "Request Authenticity")]
    RequestAuthenticity,
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CheckName::GpsCoordinates => "GPS Coordinates",
            CheckName::WeatherConditionMatch => "Weather Condition Match",
            CheckName::ReportQuality => "Report Quality",
            CheckName::ContentValidity => "Content Validity",
            CheckName::TimestampValid => "Timestamp Valid",
            CheckName::RequestAuthenticity => "Request Authenticity",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Partial,
    Failed,
    Error,
}

/// Single check outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: CheckName,
    pub status: CheckStatus,
    pub points: u32,
}

impl VerificationCheck {
    pub fn new(name: CheckName, status: CheckStatus, points: u32) -> Self {
        Self {
            name,
            status,
            points,
        }
    }

    pub fn passed(name: CheckName, points: u32) -> Self {
        Self::new(name, CheckStatus::Passed, points)
    }

    pub fn failed(name: CheckName) -> Self {
        Self::new(name, CheckStatus::Failed, 0)
    }
}

/// Admission tier derived from the final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// 70 and above: published immediately
    AutoVerified,
    /// 40-69: queued for a human reviewer
    PendingReview,
    /// Below 40: likely fake
    Flagged,
}

impl Admission {
    /// Tier for a score under the default thresholds
    pub fn from_score(score: i32) -> Self {
        Self::with_thresholds(score, 70, 40)
    }

    pub fn with_thresholds(score: i32, auto_verify_at: i32, review_at: i32) -> Self {
        if score >= auto_verify_at {
            Admission::AutoVerified
        } else if score >= review_at {
            Admission::PendingReview
        } else {
            Admission::Flagged
        }
    }

    /// Broadcast events the submission workflow emits for this tier
    pub fn event_names(&self) -> &'static [&'static str] {
        match self {
            Admission::AutoVerified => &["report:new", "report:verified"],
            Admission::PendingReview => &["report:pending"],
            Admission::Flagged => &["report:flagged"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Admission::AutoVerified => "auto_verified",
            Admission::PendingReview => "pending_review",
            Admission::Flagged => "flagged",
        }
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reputation of a network identity, 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustScore {
    value: u8,
}

impl TrustScore {
    pub const NEUTRAL: TrustScore = TrustScore { value: 50 };

    pub fn new(value: u32) -> Self {
        Self {
            value: value.min(100) as u8,
        }
    }

    /// `round(100 * verified / total)`, neutral when there is no history
    pub fn from_history(verified: usize, total: usize) -> Self {
        if total == 0 {
            return Self::NEUTRAL;
        }
        let verified = verified.min(total);
        let rounded = (200 * verified + total) / (2 * total);
        Self::new(rounded as u32)
    }

    pub fn value(&self) -> u32 {
        self.value as u32
    }
}

impl Default for TrustScore {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Final, immutable outcome of scoring one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub score: i32,
    pub checks: Vec<VerificationCheck>,
    pub warnings: Vec<String>,
    pub trust: TrustScore,
    /// Points added (or removed) for the reporter's track record
    pub trust_adjustment: i32,
    pub admission: Admission,
}

impl VerificationResult {
    pub fn check(&self, name: CheckName) -> Option<&VerificationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Points contributed by the named check, 0 when it did not run
    pub fn points_for(&self, name: CheckName) -> u32 {
        self.check(name).map(|c| c.points).unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .checks
            .iter()
            .map(|c| format!("{} +{}", c.name, c.points))
            .collect();
        format!("{} ({}): {}", self.admission, self.score, parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl DuplicateVerdict {
    pub fn clear() -> Self {
        Self {
            is_duplicate: false,
            reason: None,
        }
    }

    pub fn duplicate(reason: impl Into<String>) -> Self {
        Self {
            is_duplicate: true,
            reason: Some(reason.into()),
        }
    }
}

/// Conditions observed at the reporter's position when the report was scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    #[serde(flatten)]
    pub conditions: Conditions,
    pub fetched_at: DateTime<Utc>,
}

/// Facts the engine attaches to a report while scoring it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_at_time: Option<WeatherSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature: Option<String>,
}

/// A stored report, as seen by duplicate detection and trust estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub id: String,
    pub description: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_signature: Option<String>,
    /// Confirmed by a moderator or auto-verified
    pub verified: bool,
    pub auto_verified: bool,
    pub verification_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission: Option<Admission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_at_time: Option<WeatherSnapshot>,
    pub created_at: DateTime<Utc>,
}

impl ReportRecord {
    /// Bare record with no verification outcome attached
    pub fn new(
        description: impl Into<String>,
        location: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            location: location.into(),
            coordinates: None,
            network_identity: None,
            client_signature: None,
            verified: false,
            auto_verified: false,
            verification_score: 0,
            admission: None,
            weather_at_time: None,
            created_at,
        }
    }

    /// Record for a scored submission.
    ///
    /// Identity and signature come from the annotations, so they are only
    /// stored when the authenticity check recorded them.
    pub fn from_evaluation(
        submission: &ReportSubmission,
        result: &VerificationResult,
        annotations: &ReportAnnotations,
        created_at: DateTime<Utc>,
    ) -> Self {
        let auto_verified = result.admission == Admission::AutoVerified;
        Self {
            coordinates: submission.coordinates,
            network_identity: annotations.network_identity.clone(),
            client_signature: annotations.client_signature.clone(),
            verified: auto_verified,
            auto_verified,
            verification_score: result.score,
            admission: Some(result.admission),
            weather_at_time: annotations.weather_at_time.clone(),
            ..Self::new(&submission.description, &submission.location, created_at)
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.network_identity = Some(identity.into());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    pub fn auto_verified(mut self, auto_verified: bool) -> Self {
        self.auto_verified = auto_verified;
        self
    }

    /// Counts toward the reporter's trust
    pub fn is_verified(&self) -> bool {
        self.verified || self.auto_verified
    }
}

/// Latitude/longitude box, bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Box of `±delta` degrees on both axes around a point
    pub fn around(center: Coordinates, delta: f64) -> Self {
        Self {
            min_latitude: center.latitude - delta,
            max_latitude: center.latitude + delta,
            min_longitude: center.longitude - delta,
            max_longitude: center.longitude + delta,
        }
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}
