//! TTL cache in front of a weather provider
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use crowdcheck_core::{
    Clock, Conditions, Coordinates, GeoPoint, ProviderError, SystemClock, WeatherProvider,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Ten minutes
pub const DEFAULT_TTL_SECS: i64 = 600;

struct Entry<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

/// Owned cache state. Errors are never cached.
pub struct CachedProvider<P> {
    inner: P,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    conditions: Mutex<HashMap<String, Entry<Conditions>>>,
    places: Mutex<HashMap<String, Entry<GeoPoint>>>,
}

impl<P: WeatherProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_clock(inner, Arc::new(SystemClock), Duration::seconds(DEFAULT_TTL_SECS))
    }

    pub fn with_clock(inner: P, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner,
            clock,
            ttl,
            conditions: Mutex::new(HashMap::new()),
            places: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Entries currently held; expired ones linger until the next store
    pub fn len(&self) -> usize {
        let conditions = self.conditions.lock().map(|m| m.len()).unwrap_or(0);
        let places = self.places.lock().map(|m| m.len()).unwrap_or(0);
        conditions + places
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn coordinate_key(at: &Coordinates) -> String {
    format!("weather:{:.3},{:.3}", at.latitude, at.longitude)
}

fn lookup<T: Clone>(
    cache: &Mutex<HashMap<String, Entry<T>>>,
    key: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Option<T> {
    let mut map = cache.lock().unwrap_or_else(|e| e.into_inner());
    match map.get(key) {
        Some(entry) if now - entry.stored_at <= ttl => Some(entry.value.clone()),
        Some(_) => {
            map.remove(key);
            None
        }
        None => None,
    }
}

/// Insert a fresh entry, dropping every entry that has already expired
fn store<T>(
    cache: &Mutex<HashMap<String, Entry<T>>>,
    key: String,
    value: T,
    now: DateTime<Utc>,
    ttl: Duration,
) {
    let mut map = cache.lock().unwrap_or_else(|e| e.into_inner());
    map.retain(|_, entry| now - entry.stored_at <= ttl);
    map.insert(
        key,
        Entry {
            stored_at: now,
            value,
        },
    );
}

#[async_trait]
impl<P: WeatherProvider> WeatherProvider for CachedProvider<P> {
    async fn current_conditions(&self, at: Coordinates) -> Result<Conditions, ProviderError> {
        let key = coordinate_key(&at);
        if let Some(hit) = lookup(&self.conditions, &key, self.clock.now(), self.ttl) {
            tracing::debug!(%key, "weather cache hit");
            return Ok(hit);
        }

        let fresh = self.inner.current_conditions(at).await?;
        store(&self.conditions, key, fresh.clone(), self.clock.now(), self.ttl);
        Ok(fresh)
    }

    async fn geocode(&self, city: &str) -> Result<GeoPoint, ProviderError> {
        let key = format!("geo:{}", city.trim().to_lowercase());
        if let Some(hit) = lookup(&self.places, &key, self.clock.now(), self.ttl) {
            return Ok(hit);
        }

        let fresh = self.inner.geocode(city).await?;
        store(&self.places, key, fresh.clone(), self.clock.now(), self.ttl);
        Ok(fresh)
    }
}
