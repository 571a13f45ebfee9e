//! Settings for one sync run.

use chrono::NaiveDate;
use std::time::Duration;

use crate::errors::{Error, Result};
use crate::prices::constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_START_DATE,
};
use crate::prices::model::parse_day;

/// Upper bound on retries, so a typo cannot stall a run for hours.
const MAX_ALLOWED_RETRIES: u32 = 10;

/// Upper bound on the first retry delay.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(600);

/// Explicit configuration handed to the sync orchestrator at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    /// Watermark used for instruments with no stored rows.
    pub default_start_date: NaiveDate,
    /// Bound on a single provider request.
    pub fetch_timeout: Duration,
    /// Extra attempts for transient source errors.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one.
    pub retry_backoff: Duration,
    /// Skip rows whose price is below zero.
    pub reject_negative_prices: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_start_date: parse_day(DEFAULT_START_DATE).unwrap_or(NaiveDate::MIN),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            reject_negative_prices: false,
        }
    }
}

impl SyncSettings {
    /// Reject settings that cannot produce a sensible run.
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout.is_zero() {
            return Err(Error::InvalidConfigValue(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_retries > MAX_ALLOWED_RETRIES {
            return Err(Error::InvalidConfigValue(format!(
                "max retries must be at most {}, got {}",
                MAX_ALLOWED_RETRIES, self.max_retries
            )));
        }
        if self.retry_backoff > MAX_RETRY_BACKOFF {
            return Err(Error::InvalidConfigValue(format!(
                "retry backoff must be at most {:?}, got {:?}",
                MAX_RETRY_BACKOFF, self.retry_backoff
            )));
        }
        Ok(())
    }
}
