//! Substation (GPZ) records.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Serialize;

use super::Coordinate;

/// Years for which the catalog carries capacity forecasts.
pub const FORECAST_YEARS: RangeInclusive<u16> = 2025..=2030;

/// Distributor name used when a record does not name one.
pub const UNKNOWN_DISTRIBUTOR: &str = "Unknown";

/// Error returned when a facility record breaks an invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidFacility {
    /// Facilities must be named
    #[error("facility name must not be empty")]
    EmptyName,

    /// Capacity must be a finite, non-negative number of megawatts
    #[error("invalid capacity {0} MW: must be finite and non-negative")]
    Capacity(f64),
}

/// A substation with a fixed location and grid capacity.
///
/// Facilities are immutable once built. The catalog replaces them
/// wholesale on reload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facility {
    pub name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub distributor: String,
    pub location: Coordinate,
    /// Currently available capacity in megawatts.
    pub available_capacity_mw: f64,
    /// Forecast capacity by year. Sparse: missing years read as 0.0.
    pub forecasts: BTreeMap<u16, f64>,
}

impl Facility {
    /// Create a facility with the required fields.
    ///
    /// Optional descriptive fields start empty, the distributor starts
    /// as [`UNKNOWN_DISTRIBUTOR`] and there are no forecasts.
    pub fn new(
        name: impl Into<String>,
        location: Coordinate,
        available_capacity_mw: f64,
    ) -> Result<Self, InvalidFacility> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InvalidFacility::EmptyName);
        }
        validate_capacity(available_capacity_mw)?;

        Ok(Self {
            name,
            address: String::new(),
            city: String::new(),
            postal_code: String::new(),
            distributor: UNKNOWN_DISTRIBUTOR.to_string(),
            location,
            available_capacity_mw,
            forecasts: BTreeMap::new(),
        })
    }

    /// Set the street address, city and postal code.
    pub fn with_address(
        mut self,
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.address = address.into();
        self.city = city.into();
        self.postal_code = postal_code.into();
        self
    }

    /// Set the distributor. Blank names fall back to [`UNKNOWN_DISTRIBUTOR`].
    pub fn with_distributor(mut self, distributor: impl Into<String>) -> Self {
        let distributor = distributor.into();
        self.distributor = if distributor.trim().is_empty() {
            UNKNOWN_DISTRIBUTOR.to_string()
        } else {
            distributor
        };
        self
    }

    /// Record the forecast capacity for a year.
    pub fn with_forecast(mut self, year: u16, capacity_mw: f64) -> Self {
        self.forecasts.insert(year, capacity_mw);
        self
    }

    /// Forecast capacity for `year`, or 0.0 when none is recorded.
    pub fn forecast(&self, year: u16) -> f64 {
        self.forecasts.get(&year).copied().unwrap_or(0.0)
    }

    /// Forecasts for every catalog year, filling gaps with 0.0.
    pub fn forecast_by_year(&self) -> BTreeMap<u16, f64> {
        FORECAST_YEARS.map(|y| (y, self.forecast(y))).collect()
    }

    /// Address, city and postal code joined for display.
    ///
    /// Empty parts are skipped.
    pub fn full_address(&self) -> String {
        [&self.address, &self.city, &self.postal_code]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn validate_capacity(mw: f64) -> Result<(), InvalidFacility> {
    if mw.is_finite() && mw >= 0.0 {
        Ok(())
    } else {
        Err(InvalidFacility::Capacity(mw))
    }
}
