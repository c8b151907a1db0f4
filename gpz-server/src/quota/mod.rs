//! Per-user monthly lookup quota.
//!
//! Counters are keyed by user and calendar month (UTC). A new month starts
//! a fresh counter; old counters are kept.

mod error;
mod memory;
mod sqlite;
mod store;
mod tracker;

pub use error::QuotaError;
pub use memory::InMemoryQuotaStore;
pub use sqlite::SqliteQuotaStore;
pub use store::{QuotaStore, UsageCounter};
pub use tracker::{DEFAULT_MONTHLY_LIMIT, QuotaTracker};
