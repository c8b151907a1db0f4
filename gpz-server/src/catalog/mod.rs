//! Facility catalog.
//!
//! The catalog is loaded from a persisted source (a CSV file in
//! production), held in memory as an immutable snapshot, and replaced
//! wholesale whenever a facility is added.

mod csv_file;
mod error;
mod seed;
mod source;
mod store;

pub use csv_file::CsvCatalogSource;
pub use error::CatalogError;
pub use seed::seed_facilities;
pub use source::{CatalogSource, InMemoryCatalogSource};
pub use store::{Catalog, CatalogSnapshot};
