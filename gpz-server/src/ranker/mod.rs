//! Nearest-facility ranking.
//!
//! Given a query coordinate and a catalog snapshot, computes the geodesic
//! distance to every facility and keeps the closest ones. The ranker is
//! general-purpose; the end-user result count lives in the lookup config.

mod geodesic;
mod rank;

pub use geodesic::distance_km;
pub use rank::{RankedResult, rank_nearest};
