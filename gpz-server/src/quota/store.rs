//! Usage counter storage abstraction.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::UsageMonth;

use super::error::QuotaError;

/// Lookups performed by one user in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    pub user_id: String,
    pub month: UsageMonth,
    pub count: u32,
}

/// Persisted per-user, per-month lookup counters.
///
/// There is at most one counter per (user, month). Counters are created
/// at zero on first touch, only ever incremented, and never deleted.
///
/// Both operations must be atomic with respect to concurrent callers:
/// two first touches must not create two rows, and two increments must
/// both be counted.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Fetch the counter, creating it at zero if absent.
    async fn get_or_create(
        &self,
        user_id: &str,
        month: &UsageMonth,
    ) -> Result<UsageCounter, QuotaError>;

    /// Add one to the counter (creating it if absent) and return the new count.
    async fn increment(&self, user_id: &str, month: &UsageMonth) -> Result<u32, QuotaError>;
}
