//! Geodesic distance on the WGS-84 ellipsoid.
//!
//! Every distance used for ranking goes through [`distance_km`], so
//! comparisons between pairs are always made with the same model.

use geo::{Distance, Geodesic, Point};

use crate::domain::Coordinate;

/// Geodesic distance between two coordinates in kilometres.
///
/// Uses Karney's geodesic on the WGS-84 ellipsoid, which converges for
/// every pair of points, antipodes included.
///
/// # Example
///
/// ```
/// use gpz_server::domain::Coordinate;
/// use gpz_server::ranker::distance_km;
///
/// let london = Coordinate::new(51.5074, -0.1278).unwrap();
/// let paris = Coordinate::new(48.8566, 2.3522).unwrap();
/// let d = distance_km(london, paris);
/// assert!((d - 343.92).abs() < 0.05);
/// ```
pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
    Geodesic.distance(to_point(from), to_point(to)) / 1000.0
}

fn to_point(c: Coordinate) -> Point<f64> {
    Point::new(c.longitude(), c.latitude())
}
