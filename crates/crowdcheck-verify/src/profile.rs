//! Engine profile: every threshold and point value the scorer uses
//!
//! The default profile is the production calibration. Deployments can
//! override individual fields from YAML; missing fields keep their defaults.

use crowdcheck_core::CrowdError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

static DEFAULT_SUSPICIOUS_TOKENS: Lazy<Vec<String>> = Lazy::new(|| {
    ["test", "fake", "dummy", "xxx", "123", "asdf"]
        .iter()
        .map(|t| t.to_string())
        .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineProfile {
    /// Profile name (e.g. "default@1.0")
    pub name: String,

    // === Point values ===

    pub gps_points: u32,
    pub weather_match_points: u32,
    /// Credit when the description does not match live weather
    pub weather_partial_points: u32,
    pub quality_points: u32,
    pub content_points: u32,
    pub timestamp_points: u32,
    pub authenticity_points: u32,

    // === Content ===

    pub min_description_chars: usize,
    /// Longer descriptions get no quality credit but are not penalized
    pub max_description_chars: usize,
    pub suspicious_tokens: Vec<String>,

    // === Weather match ===

    pub hot_above_celsius: f64,
    pub cold_below_celsius: f64,
    pub windy_above: f64,
    pub provider_timeout_ms: u64,

    // === Duplicate detection ===

    pub duplicate_window_minutes: i64,
    pub max_reports_per_identity: usize,
    pub max_reports_per_area: usize,
    /// Half-width of the area box, in degrees
    pub area_delta_degrees: f64,

    // === Trust ===

    pub trust_history_limit: usize,
    pub trusted_above: u32,
    pub distrusted_below: u32,
    pub trust_bonus: i32,
    pub trust_penalty: i32,

    // === Admission ===

    pub auto_verify_at: i32,
    pub review_at: i32,
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            name: "default@1.0".to_string(),
            gps_points: 20,
            weather_match_points: 30,
            weather_partial_points: 10,
            quality_points: 15,
            content_points: 15,
            timestamp_points: 10,
            authenticity_points: 10,
            min_description_chars: 20,
            max_description_chars: 1000,
            suspicious_tokens: DEFAULT_SUSPICIOUS_TOKENS.clone(),
            hot_above_celsius: 30.0,
            cold_below_celsius: 15.0,
            windy_above: 5.0,
            provider_timeout_ms: 5_000,
            duplicate_window_minutes: 30,
            max_reports_per_identity: 3,
            max_reports_per_area: 5,
            area_delta_degrees: 0.01,
            trust_history_limit: 50,
            trusted_above: 70,
            distrusted_below: 30,
            trust_bonus: 10,
            trust_penalty: 10,
            auto_verify_at: 70,
            review_at: 40,
        }
    }
}

impl EngineProfile {
    pub fn from_yaml(yaml: &str) -> Result<Self, CrowdError> {
        let profile: Self =
            serde_yaml::from_str(yaml).map_err(|e| CrowdError::Config(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CrowdError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| CrowdError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&yaml)
    }

    /// Reject profiles whose thresholds contradict each other
    pub fn validate(&self) -> Result<(), CrowdError> {
        if self.review_at > self.auto_verify_at {
            return Err(CrowdError::Config(format!(
                "review_at ({}) above auto_verify_at ({})",
                self.review_at, self.auto_verify_at
            )));
        }
        if self.distrusted_below > self.trusted_above {
            return Err(CrowdError::Config(format!(
                "distrusted_below ({}) above trusted_above ({})",
                self.distrusted_below, self.trusted_above
            )));
        }
        if self.min_description_chars > self.max_description_chars {
            return Err(CrowdError::Config(
                "min_description_chars above max_description_chars".to_string(),
            ));
        }
        if self.area_delta_degrees < 0.0 {
            return Err(CrowdError::Config("negative area_delta_degrees".to_string()));
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn duplicate_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.duplicate_window_minutes)
    }
}
