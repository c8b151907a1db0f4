//! Geographic coordinate type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when constructing an out-of-range coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate ({latitude}, {longitude}): {reason}")]
pub struct InvalidCoordinate {
    latitude: f64,
    longitude: f64,
    reason: &'static str,
}

/// A WGS-84 latitude/longitude pair in degrees.
///
/// Latitude is always within [-90, 90] and longitude within [-180, 180].
/// Any `Coordinate` value is valid by construction.
///
/// # Examples
///
/// ```
/// use gpz_server::domain::Coordinate;
///
/// let warsaw = Coordinate::new(52.2297, 21.0122).unwrap();
/// assert_eq!(warsaw.latitude(), 52.2297);
///
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// assert!(Coordinate::new(0.0, f64::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate", into = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, validating both components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinate> {
        let invalid = |reason| InvalidCoordinate {
            latitude,
            longitude,
            reason,
        };

        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(invalid("components must be finite"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(invalid("latitude must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(invalid("longitude must be within [-180, 180]"));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Debug for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coordinate({}, {})", self.latitude, self.longitude)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Unvalidated wire form, used only for serde.
#[derive(Serialize, Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = InvalidCoordinate;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl From<Coordinate> for RawCoordinate {
    fn from(c: Coordinate) -> Self {
        RawCoordinate {
            latitude: c.latitude,
            longitude: c.longitude,
        }
    }
}
