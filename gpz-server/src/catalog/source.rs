//! Catalog source abstraction.

use std::sync::Mutex;

use crate::domain::Facility;

use super::error::CatalogError;

/// Where facility records are persisted.
///
/// This abstraction allows the catalog to be tested without touching disk.
pub trait CatalogSource: Send + Sync {
    /// Read every facility record.
    ///
    /// Implementations backed by storage that does not exist yet must
    /// create it populated with the seed facilities before reading.
    fn load(&self) -> Result<Vec<Facility>, CatalogError>;

    /// Persist one additional facility.
    fn append(&self, facility: &Facility) -> Result<(), CatalogError>;
}

/// Catalog source held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalogSource {
    facilities: Mutex<Vec<Facility>>,
}

impl InMemoryCatalogSource {
    /// Create a source holding `facilities`.
    pub fn new(facilities: Vec<Facility>) -> Self {
        Self {
            facilities: Mutex::new(facilities),
        }
    }
}

impl CatalogSource for InMemoryCatalogSource {
    fn load(&self) -> Result<Vec<Facility>, CatalogError> {
        let guard = self
            .facilities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.clone())
    }

    fn append(&self, facility: &Facility) -> Result<(), CatalogError> {
        let mut guard = self
            .facilities
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.push(facility.clone());
        Ok(())
    }
}
