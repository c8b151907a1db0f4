//! Monthly lookup allowance.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::UsageMonth;

use super::error::QuotaError;
use super::store::{QuotaStore, UsageCounter};

/// Default number of lookups a user may perform per calendar month.
pub const DEFAULT_MONTHLY_LIMIT: u32 = 100;

/// Enforces a per-user monthly lookup limit over a [`QuotaStore`].
///
/// Lookups use two phases: [`check_and_reserve`](Self::check_and_reserve)
/// before the expensive work, and [`commit_increment`](Self::commit_increment)
/// only once the lookup has succeeded. Failed lookups therefore cost nothing.
///
/// The check and the commit are separate operations, so two concurrent
/// lookups that both pass the check with one lookup left may both commit.
/// The counter then reads over the limit and `remaining` goes negative;
/// the stored count itself is never clamped.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    limit: u32,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn QuotaStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Lookups left for `user_id` in `month`, creating the counter if needed.
    ///
    /// Negative when the counter has overrun the limit.
    pub async fn remaining(&self, user_id: &str, month: &UsageMonth) -> Result<i64, QuotaError> {
        let counter = self.store.get_or_create(user_id, month).await?;
        Ok(self.remaining_after(counter.count))
    }

    /// The user's counter for `month`, creating it if needed.
    pub async fn usage(&self, user_id: &str, month: &UsageMonth) -> Result<UsageCounter, QuotaError> {
        self.store.get_or_create(user_id, month).await
    }

    /// Ensure the user may perform one more lookup.
    ///
    /// Returns the remaining allowance, which is always positive. Nothing is
    /// consumed; call [`commit_increment`](Self::commit_increment) once the
    /// lookup succeeds.
    pub async fn check_and_reserve(
        &self,
        user_id: &str,
        month: &UsageMonth,
    ) -> Result<i64, QuotaError> {
        let remaining = self.remaining(user_id, month).await?;
        if remaining <= 0 {
            info!(user_id, %month, limit = self.limit, "monthly lookup limit reached");
            return Err(QuotaError::Exceeded {
                user_id: user_id.to_string(),
                month: month.clone(),
                limit: self.limit,
            });
        }
        Ok(remaining)
    }

    /// Record one successful lookup and return the allowance left afterwards.
    pub async fn commit_increment(
        &self,
        user_id: &str,
        month: &UsageMonth,
    ) -> Result<i64, QuotaError> {
        let count = self.store.increment(user_id, month).await?;
        debug!(user_id, %month, count, "lookup recorded");
        Ok(self.remaining_after(count))
    }

    fn remaining_after(&self, count: u32) -> i64 {
        i64::from(self.limit) - i64::from(count)
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}
