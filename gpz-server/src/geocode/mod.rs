//! Address geocoding.
//!
//! Converts free-text addresses into coordinates. The production
//! implementation calls Nominatim over HTTP and sits behind a cache; an
//! offline table-backed implementation exists for development and tests.
//!
//! Geocoders are slow and unreliable. Callers should treat any error the
//! same as an address that could not be found.

mod cache;
mod client;
mod error;
mod mock;

use async_trait::async_trait;

use crate::domain::Coordinate;

pub use cache::{CachedGeocoder, GeocodeCacheConfig, normalize_address};
pub use client::{NominatimClient, NominatimConfig};
pub use error::GeocodeError;
pub use mock::StaticGeocoder;

/// Resolves free-text addresses to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `address`, returning `Ok(None)` when nothing matches.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError>;
}
