//! OpenWeather HTTP client
use async_trait::async_trait;
use crowdcheck_core::{Conditions, Coordinates, GeoPoint, ProviderError, WeatherProvider};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    weather: Vec<WeatherBlock>,
    #[serde(default)]
    wind: Option<WindBlock>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    #[serde(default)]
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct WeatherBlock {
    description: String,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeEntry {
    lat: f64,
    lon: f64,
    name: String,
    #[serde(default)]
    country: Option<String>,
}

pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl OpenWeatherProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("crowdcheck/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::MissingCredential)
    }

    fn map_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if err.is_decode() {
            ProviderError::BadResponse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::BadResponse(format!("HTTP {}", status))
        } else {
            ProviderError::Unreachable(err.to_string())
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_error(e))?
            .json::<T>()
            .await
            .map_err(|e| self.map_error(e))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_conditions(&self, at: Coordinates) -> Result<Conditions, ProviderError> {
        let key = self.key()?;
        let body: CurrentResponse = self
            .get_json(
                "/data/2.5/weather",
                &[
                    ("lat", at.latitude.to_string()),
                    ("lon", at.longitude.to_string()),
                    ("units", "metric".to_string()),
                    ("appid", key.to_string()),
                ],
            )
            .await?;
        conditions_from(body)
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        let key = self.key()?;
        let entries: Vec<GeocodeEntry> = self
            .get_json(
                "/geo/1.0/direct",
                &[
                    ("q", city.to_string()),
                    ("limit", "1".to_string()),
                    ("appid", key.to_string()),
                ],
            )
            .await?;

        entries
            .into_iter()
            .next()
            .map(|e| GeoPoint {
                lat: e.lat,
                lon: e.lon,
                name: e.name,
                country: e.country,
            })
            .ok_or_else(|| ProviderError::NotFound(format!("could not geocode city: {}", city)))
    }
}

fn conditions_from(body: CurrentResponse) -> Result<Conditions, ProviderError> {
    let condition_text = body
        .weather
        .into_iter()
        .next()
        .map(|w| w.description)
        .ok_or_else(|| ProviderError::BadResponse("no weather entries".to_string()))?;

    Ok(Conditions {
        condition_text,
        temperature_celsius: body.main.temp,
        wind_speed: body.wind.map(|w| w.speed).unwrap_or(0.0),
        humidity: body.main.humidity,
    })
}
