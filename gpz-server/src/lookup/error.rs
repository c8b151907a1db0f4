//! Lookup and registration errors.

use crate::catalog::CatalogError;
use crate::domain::{InvalidCoordinate, InvalidFacility, UsageMonth};
use crate::quota::QuotaError;

/// Error from a nearest-facility lookup.
///
/// A failed lookup never consumes quota and never carries partial results.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Blank address submitted
    #[error("address must not be empty")]
    EmptyAddress,

    /// The geocoder found nothing, failed, or timed out
    #[error("address not found: {address}")]
    AddressNotFound { address: String },

    /// The user has used up this month's lookups
    #[error("monthly limit of {limit} lookups reached for {month}")]
    QuotaExceeded { month: UsageMonth, limit: u32 },

    /// The quota store failed
    #[error(transparent)]
    Quota(QuotaError),
}

impl From<QuotaError> for LookupError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Exceeded { month, limit, .. } => Self::QuotaExceeded { month, limit },
            other => Self::Quota(other),
        }
    }
}

/// Error from registering a new facility.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    /// The facility's address could not be geocoded
    #[error("address not found: {address}")]
    AddressNotFound { address: String },

    /// The submitted record is unusable
    #[error("invalid facility: {0}")]
    Invalid(String),

    /// The catalog could not be written or reloaded
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl From<InvalidFacility> for AdminError {
    fn from(err: InvalidFacility) -> Self {
        Self::Invalid(err.to_string())
    }
}

impl From<InvalidCoordinate> for AdminError {
    fn from(err: InvalidCoordinate) -> Self {
        Self::Invalid(err.to_string())
    }
}
