//! In-process counter store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::UsageMonth;

use super::error::QuotaError;
use super::store::{QuotaStore, UsageCounter};

type CounterKey = (String, UsageMonth);

/// Counter store held in memory.
///
/// Every operation runs under one mutex, which makes create-if-absent and
/// increment atomic. Counters are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    counters: Mutex<HashMap<CounterKey, u32>>,
}

impl InMemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a counter.
    ///
    /// Intended for administration and tests; lookups only ever increment.
    pub fn set_count(&self, user_id: &str, month: &UsageMonth, count: u32) {
        self.lock()
            .insert((user_id.to_string(), month.clone()), count);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CounterKey, u32>> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn get_or_create(
        &self,
        user_id: &str,
        month: &UsageMonth,
    ) -> Result<UsageCounter, QuotaError> {
        let mut counters = self.lock();
        let count = *counters
            .entry((user_id.to_string(), month.clone()))
            .or_insert(0);

        Ok(UsageCounter {
            user_id: user_id.to_string(),
            month: month.clone(),
            count,
        })
    }

    async fn increment(&self, user_id: &str, month: &UsageMonth) -> Result<u32, QuotaError> {
        let mut counters = self.lock();
        let count = counters
            .entry((user_id.to_string(), month.clone()))
            .or_insert(0);

        *count = count.checked_add(1).ok_or_else(|| QuotaError::Corrupt {
            message: format!("counter for {user_id} in {month} overflowed"),
        })?;
        Ok(*count)
    }
}
