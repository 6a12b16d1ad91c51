//! Environment configuration
use crowdcheck_core::CrowdError;
use crowdcheck_ratelimit::RateLimitPolicy;
use crowdcheck_verify::EngineProfile;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address (CROWDCHECK_ADDR)
    pub addr: String,
    /// OpenWeather key (OPENWEATHER_KEY); weather checks degrade without it
    pub openweather_key: Option<String>,
    /// Override for the OpenWeather endpoint (OPENWEATHER_BASE_URL)
    pub openweather_base_url: Option<String>,
    /// Loaded from CROWDCHECK_PROFILE when set
    pub profile: EngineProfile,
    pub rate_limit: RateLimitPolicy,
    /// Take the network identity from X-Forwarded-For (CROWDCHECK_TRUST_PROXY)
    pub trust_proxy: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            openweather_key: None,
            openweather_base_url: None,
            profile: EngineProfile::default(),
            rate_limit: RateLimitPolicy::default(),
            trust_proxy: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CrowdError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CrowdError> {
        let defaults = Self::default();

        let profile = match lookup("CROWDCHECK_PROFILE") {
            Some(path) => EngineProfile::from_file(&path)?,
            None => defaults.profile,
        };

        let mut rate_limit = defaults.rate_limit;
        if let Some(max) = lookup("CROWDCHECK_RATE_MAX") {
            rate_limit.max_requests = parse("CROWDCHECK_RATE_MAX", &max)?;
        }
        if let Some(secs) = lookup("CROWDCHECK_RATE_WINDOW_SECS") {
            rate_limit.window_secs = parse("CROWDCHECK_RATE_WINDOW_SECS", &secs)?;
        }
        rate_limit.validate()?;

        let openweather_key = lookup("OPENWEATHER_KEY").filter(|k| !k.is_empty());
        if openweather_key.is_none() {
            tracing::warn!("OPENWEATHER_KEY is not set; weather cross-checks will report errors");
        }

        Ok(Self {
            addr: lookup("CROWDCHECK_ADDR").unwrap_or(defaults.addr),
            openweather_key,
            openweather_base_url: lookup("OPENWEATHER_BASE_URL"),
            profile,
            rate_limit,
            trust_proxy: lookup("CROWDCHECK_TRUST_PROXY")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, CrowdError> {
    value
        .trim()
        .parse()
        .map_err(|_| CrowdError::Config(format!("{}: invalid value {:?}", key, value)))
}
