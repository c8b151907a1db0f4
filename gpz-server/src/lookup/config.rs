//! Lookup tuning.

use std::time::Duration;

use crate::quota::DEFAULT_MONTHLY_LIMIT;

/// Configuration for nearest-facility lookups.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Lookups each user may perform per calendar month.
    pub monthly_limit: u32,

    /// Number of nearest facilities returned per lookup.
    pub result_limit: usize,

    /// Longest wait for the geocoder (seconds).
    /// A slower answer counts as address not found.
    pub geocode_timeout_secs: u64,
}

impl LookupConfig {
    pub fn new(monthly_limit: u32, result_limit: usize, geocode_timeout_secs: u64) -> Self {
        Self {
            monthly_limit,
            result_limit,
            geocode_timeout_secs,
        }
    }

    /// Returns the geocode timeout as a Duration.
    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
            result_limit: 3,
            geocode_timeout_secs: 10,
        }
    }
}
