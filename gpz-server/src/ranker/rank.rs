//! Nearest-facility ranking.

use crate::domain::{Coordinate, Facility};

use super::geodesic::distance_km;

/// A facility paired with its distance from the query point.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub facility: Facility,
    /// Geodesic distance from the query, in kilometres.
    pub distance_km: f64,
}

/// Return the `limit` facilities closest to `query`, nearest first.
///
/// Distances are computed for every facility before any are dropped.
/// The sort is stable, so facilities at equal distance keep their
/// catalog order. Asking for more results than the catalog holds
/// returns the whole catalog; `limit == 0` returns nothing.
pub fn rank_nearest(query: Coordinate, catalog: &[Facility], limit: usize) -> Vec<RankedResult> {
    if limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<RankedResult> = catalog
        .iter()
        .map(|facility| RankedResult {
            facility: facility.clone(),
            distance_km: distance_km(query, facility.location),
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limit);
    ranked
}
