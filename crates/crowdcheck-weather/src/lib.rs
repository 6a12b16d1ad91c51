//! Crowdcheck Weather: live conditions for cross-validating reports
//!
//! [`OpenWeatherProvider`] talks to the OpenWeather HTTP API.
//! [`CachedProvider`] wraps any provider with a TTL cache so bursts of
//! reports from one area cost a single upstream call.

pub mod cache;
pub mod openweather;

pub use cache::{CachedProvider, DEFAULT_TTL_SECS};
pub use openweather::{OpenWeatherProvider, DEFAULT_BASE_URL};
