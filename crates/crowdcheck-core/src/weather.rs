//! Weather provider contract
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data_model::Coordinates;
use crate::error::ProviderError;

/// Current conditions at a point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    /// Provider's phrase, e.g. "light rain"
    pub condition_text: String,
    pub temperature_celsius: f64,
    pub wind_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
}

/// Result of forward geocoding a city name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(&self, at: Coordinates) -> Result<Conditions, ProviderError>;

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError>;
}

#[async_trait]
impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    async fn current_conditions(&self, at: Coordinates) -> Result<Conditions, ProviderError> {
        (**self).current_conditions(at).await
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        (**self).geocode(city).await
    }
}
