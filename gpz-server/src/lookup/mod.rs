//! Nearest-substation lookups.
//!
//! Answers "which substations are closest to this address, and how much
//! capacity do they have?" while enforcing each user's monthly allowance.
//! Quota is checked before the geocoder is called and charged only after
//! a lookup produces results.

mod config;
mod error;
mod service;

pub use config::LookupConfig;
pub use error::{AdminError, LookupError};
pub use service::{LookupOutcome, LookupService, NewFacility, QuotaStatus};
