//! Domain types for the GPZ finder.
//!
//! These types enforce their invariants at construction time, so code
//! that receives them can trust their validity.

mod coordinate;
mod facility;
mod month;

pub use coordinate::{Coordinate, InvalidCoordinate};
pub use facility::{FORECAST_YEARS, Facility, InvalidFacility, UNKNOWN_DISTRIBUTOR};
pub use month::{InvalidMonth, UsageMonth};
