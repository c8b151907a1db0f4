//! Caching layer for geocoding results.
//!
//! Public geocoders are slow and rate limited, and users tend to repeat
//! the same addresses. Only successful resolutions are cached; misses and
//! errors always go back to the inner geocoder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::Coordinate;

use super::Geocoder;
use super::error::GeocodeError;

/// Configuration for the geocode cache.
#[derive(Debug, Clone)]
pub struct GeocodeCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for GeocodeCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 10_000,
        }
    }
}

/// Geocoder with caching.
///
/// Wraps any [`Geocoder`] and caches found coordinates, keyed by the
/// normalized address text.
pub struct CachedGeocoder {
    inner: Arc<dyn Geocoder>,
    cache: MokaCache<String, Coordinate>,
}

impl CachedGeocoder {
    /// Create a new cached geocoder.
    pub fn new(inner: Arc<dyn Geocoder>, config: &GeocodeCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { inner, cache }
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Geocoder for CachedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let key = normalize_address(address);

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(Some(cached));
        }

        let resolved = self.inner.geocode(address).await?;
        if let Some(coordinate) = resolved {
            self.cache.insert(key, coordinate).await;
        }

        Ok(resolved)
    }
}

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
