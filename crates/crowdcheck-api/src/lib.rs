//! Crowdcheck API /v1: report intake and public listing over HTTP
pub mod config;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use config::AppConfig;
pub use events::{EventBus, ReportEvent};
pub use state::AppState;

use anyhow::Context;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use crowdcheck_core::{Clock, MemoryHistory, ProviderError, SystemClock};
use crowdcheck_weather::{CachedProvider, OpenWeatherProvider, DEFAULT_TTL_SECS};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/reports",
            get(handlers::list_reports).post(handlers::submit_report),
        )
        .route("/v1/geocode", get(handlers::geocode))
        .route("/v1/audit/stats", get(handlers::audit_stats))
        .route("/v1/audit/entries", get(handlers::audit_entries))
        .route("/v1/audit/export", get(handlers::audit_export))
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(from_fn(middleware::security_headers))
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// OpenWeather behind the TTL cache, expiring on `clock`
pub fn weather_provider(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<CachedProvider<OpenWeatherProvider>, ProviderError> {
    let mut provider =
        OpenWeatherProvider::new(config.openweather_key.clone(), config.profile.provider_timeout())?;
    if let Some(base_url) = &config.openweather_base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    Ok(CachedProvider::with_clock(
        provider,
        clock,
        chrono::Duration::seconds(DEFAULT_TTL_SECS),
    ))
}

/// Build state from config and serve until the process is stopped
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let weather = weather_provider(&config, clock.clone()).context("building weather client")?;

    let state = AppState::new(
        config.profile.clone(),
        config.rate_limit.clone(),
        Arc::new(MemoryHistory::new()),
        Arc::new(weather),
        clock,
    )
    .context("registering metrics")?
    .trust_proxy(config.trust_proxy);

    let sweeper = state.limiter.spawn_sweeper();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    tracing::info!("Crowdcheck API listening on {}", config.addr);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;
    sweeper.abort();
    served.context("server error")
}
