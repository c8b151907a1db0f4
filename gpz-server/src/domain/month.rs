//! Calendar month used as the quota period.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Error returned when parsing an invalid month key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid month {input:?}: expected YYYY-MM")]
pub struct InvalidMonth {
    input: String,
}

/// A UTC calendar month, keyed as `"YYYY-MM"`.
///
/// # Examples
///
/// ```
/// use gpz_server::domain::UsageMonth;
///
/// let may = UsageMonth::parse("2025-05").unwrap();
/// assert_eq!(may.as_str(), "2025-05");
///
/// assert!(UsageMonth::parse("2025-13").is_err());
/// assert!(UsageMonth::parse("2025-5").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UsageMonth(String);

impl UsageMonth {
    /// The month containing `at`.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        UsageMonth(format!("{:04}-{:02}", at.year(), at.month()))
    }

    /// The current UTC month.
    pub fn current() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Parse a `"YYYY-MM"` key.
    pub fn parse(s: &str) -> Result<Self, InvalidMonth> {
        let invalid = || InvalidMonth {
            input: s.to_string(),
        };

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month_num: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month_num) {
            return Err(invalid());
        }

        Ok(UsageMonth(s.to_string()))
    }

    /// The month key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UsageMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UsageMonth({})", self.0)
    }
}

impl fmt::Display for UsageMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
