//! Sample facilities written to a fresh catalog.

use crate::domain::{Coordinate, Facility};

use super::error::CatalogError;

/// (name, address, city, lat, lon, capacity MW)
const SEED: [(&str, &str, &str, f64, f64, f64); 3] = [
    ("GPZ Centrum", "ul. Przykładowa 1", "Warszawa", 52.2297, 21.0122, 10.5),
    ("GPZ Wschód", "ul. Wschodnia 15", "Warszawa", 52.2360, 21.0212, 8.2),
    ("GPZ Zachód", "ul. Zachodnia 7", "Warszawa", 52.2299, 20.9762, 12.0),
];

/// The facilities a new catalog starts with.
pub fn seed_facilities() -> Result<Vec<Facility>, CatalogError> {
    SEED.iter()
        .map(|&(name, address, city, lat, lon, mw)| {
            let location = Coordinate::new(lat, lon).map_err(|e| CatalogError::DataFormat {
                message: e.to_string(),
            })?;
            let facility = Facility::new(name, location, mw)
                .map_err(|e| CatalogError::DataFormat {
                    message: e.to_string(),
                })?
                .with_address(address, city, "");
            Ok(facility)
        })
        .collect()
}
