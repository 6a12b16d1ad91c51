//! Weather cross-validation
//!
//! Compares what the reporter says against what the weather provider sees
//! at the reported coordinates. Provider trouble of any kind degrades to
//! zero credit plus a warning; it never fails the evaluation.

use crowdcheck_core::{
    CheckName, CheckStatus, Clock, Conditions, Coordinates, ProviderError, VerificationCheck,
    WeatherProvider, WeatherSnapshot,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::ledger::CheckLedger;
use crate::profile::EngineProfile;

/// Which lexical rule tied the description to live conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchRule {
    Rain,
    Storm,
    Hot,
    Cold,
    Wind,
    Clear,
    Cloud,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            MatchRule::Rain => "rain",
            MatchRule::Storm => "storm",
            MatchRule::Hot => "hot",
            MatchRule::Cold => "cold",
            MatchRule::Wind => "wind",
            MatchRule::Clear => "clear",
            MatchRule::Cloud => "cloud",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    pub hot_above_celsius: f64,
    pub cold_below_celsius: f64,
    pub windy_above: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            hot_above_celsius: 30.0,
            cold_below_celsius: 15.0,
            windy_above: 5.0,
        }
    }
}

/// First rule under which the description agrees with the conditions
pub fn find_match(
    description: &str,
    conditions: &Conditions,
    thresholds: &MatchThresholds,
) -> Option<MatchRule> {
    let said = description.to_lowercase();
    let seen = conditions.condition_text.to_lowercase();

    let rules = [
        (MatchRule::Rain, said.contains("rain") && seen.contains("rain")),
        (
            MatchRule::Storm,
            said.contains("storm") && (seen.contains("storm") || seen.contains("thunder")),
        ),
        (
            MatchRule::Hot,
            said.contains("hot") && conditions.temperature_celsius > thresholds.hot_above_celsius,
        ),
        (
            MatchRule::Cold,
            said.contains("cold") && conditions.temperature_celsius < thresholds.cold_below_celsius,
        ),
        (
            MatchRule::Wind,
            said.contains("wind") && conditions.wind_speed > thresholds.windy_above,
        ),
        (MatchRule::Clear, said.contains("clear") && seen.contains("clear")),
        (MatchRule::Cloud, said.contains("cloud") && seen.contains("cloud")),
    ];

    rules.into_iter().find(|(_, hit)| *hit).map(|(rule, _)| rule)
}

/// Output of the cross-validation step
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherOutcome {
    pub ledger: CheckLedger,
    /// Conditions fetched for audit, present only on a successful lookup
    pub snapshot: Option<WeatherSnapshot>,
}

pub struct WeatherCrossValidator {
    provider: Arc<dyn WeatherProvider>,
    clock: Arc<dyn Clock>,
    thresholds: MatchThresholds,
    timeout: Duration,
    gps_points: u32,
    match_points: u32,
    partial_points: u32,
}

impl WeatherCrossValidator {
    pub fn new(
        profile: &EngineProfile,
        provider: Arc<dyn WeatherProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            clock,
            thresholds: MatchThresholds {
                hot_above_celsius: profile.hot_above_celsius,
                cold_below_celsius: profile.cold_below_celsius,
                windy_above: profile.windy_above,
            },
            timeout: profile.provider_timeout(),
            gps_points: profile.gps_points,
            match_points: profile.weather_match_points,
            partial_points: profile.weather_partial_points,
        }
    }

    /// Provider lookup bounded by the configured timeout
    pub async fn fetch(&self, at: Coordinates) -> Result<Conditions, ProviderError> {
        match tokio::time::timeout(self.timeout, self.provider.current_conditions(at)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        }
    }

    pub async fn validate(
        &self,
        description: &str,
        coordinates: Option<Coordinates>,
    ) -> WeatherOutcome {
        let Some(at) = coordinates else {
            return WeatherOutcome {
                ledger: CheckLedger::new()
                    .record(VerificationCheck::failed(CheckName::GpsCoordinates))
                    .warn("No GPS coordinates provided - location may be inaccurate"),
                snapshot: None,
            };
        };

        let ledger = CheckLedger::new()
            .record(VerificationCheck::passed(CheckName::GpsCoordinates, self.gps_points));

        let conditions = match self.fetch(at).await {
            Ok(conditions) => conditions,
            Err(err) => {
                tracing::warn!(error = %err, "weather verification failed");
                return WeatherOutcome {
                    ledger: ledger
                        .record(VerificationCheck::new(
                            CheckName::WeatherConditionMatch,
                            CheckStatus::Error,
                            0,
                        ))
                        .warn("Unable to verify against weather API"),
                    snapshot: None,
                };
            }
        };

        let ledger = match find_match(description, &conditions, &self.thresholds) {
            Some(rule) => {
                tracing::debug!(%rule, observed = %conditions.condition_text, "weather matched");
                ledger.record(VerificationCheck::passed(
                    CheckName::WeatherConditionMatch,
                    self.match_points,
                ))
            }
            None => ledger
                .record(VerificationCheck::new(
                    CheckName::WeatherConditionMatch,
                    CheckStatus::Partial,
                    self.partial_points,
                ))
                .warn("Report description does not fully match current weather conditions"),
        };

        WeatherOutcome {
            ledger,
            snapshot: Some(WeatherSnapshot {
                conditions,
                fetched_at: self.clock.now(),
            }),
        }
    }
}
