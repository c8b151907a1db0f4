//! Offline geocoder backed by a fixed address table.
//!
//! Useful for development without network access and for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{Coordinate, Facility};

use super::Geocoder;
use super::cache::normalize_address;
use super::error::GeocodeError;

/// Geocoder that resolves only the addresses it was given.
///
/// Matching ignores case and extra whitespace.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: HashMap<String, Coordinate>,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    /// Create an empty geocoder that resolves nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address.
    pub fn with(mut self, address: &str, coordinate: Coordinate) -> Self {
        self.places.insert(normalize_address(address), coordinate);
        self
    }

    /// Resolve every facility's full address and city to its location.
    ///
    /// When several facilities share a city, the first one listed wins.
    pub fn from_facilities(facilities: &[Facility]) -> Self {
        let mut places = HashMap::new();
        for f in facilities {
            places.insert(normalize_address(&f.full_address()), f.location);
            if !f.city.trim().is_empty() {
                places
                    .entry(normalize_address(&f.city))
                    .or_insert(f.location);
            }
        }

        Self {
            places,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of addresses known.
    pub fn len(&self) -> usize {
        self.places.len()
    }

    /// Check if no addresses are known.
    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Number of geocode calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.places.get(&normalize_address(address)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_facilities;

    #[tokio::test]
    async fn resolves_known_addresses_only() {
        let here = Coordinate::new(50.0, 20.0).unwrap();
        let geocoder = StaticGeocoder::new().with("Kraków, Rynek 1", here);

        assert_eq!(geocoder.geocode("kraków,  rynek 1").await.unwrap(), Some(here));
        assert_eq!(geocoder.geocode("Gdańsk").await.unwrap(), None);
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn from_facilities_maps_addresses_and_cities() {
        let seed = seed_facilities().unwrap();
        let geocoder = StaticGeocoder::from_facilities(&seed);

        // Three full addresses plus one shared city
        assert_eq!(geocoder.len(), 4);

        let wschod = geocoder
            .geocode("ul. Wschodnia 15, Warszawa")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(wschod, seed[1].location);

        let city = geocoder.geocode("WARSZAWA").await.unwrap().unwrap();
        assert_eq!(city, seed[0].location);
    }
}
