//! Quota error types.

use crate::domain::UsageMonth;

/// Errors from the usage quota tracker and its stores.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// The user has no lookups left this month
    #[error("monthly limit of {limit} lookups reached for {user_id} in {month}")]
    Exceeded {
        user_id: String,
        month: UsageMonth,
        limit: u32,
    },

    /// The counter store failed
    #[error("quota store error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored counter is outside the representable range
    #[error("corrupt usage counter: {message}")]
    Corrupt { message: String },
}
