//! Market data client facade.
//!
//! Wraps a [`MarketDataProvider`] with the guarantees the sync loop relies
//! on: every request is bounded by a timeout, consecutive requests respect
//! the provider's minimum spacing, transient failures are retried with
//! exponential backoff, and an empty answer is reported as
//! [`SourceFetchError::NoData`].

use chrono::NaiveDate;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use pricevault_market_data::{MarketDataError, MarketDataProvider, RawPriceRow, RetryClass};

use super::errors::SourceFetchError;
use super::model::InstrumentId;
use crate::config::SyncSettings;

/// Client for fetching daily prices from one provider.
pub struct MarketDataClient {
    provider: Arc<dyn MarketDataProvider>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    last_request: Option<Instant>,
}

impl MarketDataClient {
    pub fn new(provider: Arc<dyn MarketDataProvider>, settings: &SyncSettings) -> Self {
        Self {
            provider,
            timeout: settings.fetch_timeout,
            max_retries: settings.max_retries,
            retry_backoff: settings.retry_backoff,
            last_request: None,
        }
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    /// Fetch daily prices for `instrument` over `[start, end]`.
    ///
    /// Returns at least one raw row; a provider answering with nothing is an
    /// error.
    pub async fn fetch_daily_prices(
        &mut self,
        instrument: &InstrumentId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceRow>, SourceFetchError> {
        let mut attempt: u32 = 0;

        loop {
            match self.fetch_once(instrument, start, end).await {
                Ok(rows) if rows.is_empty() => return Err(SourceFetchError::NoData),
                Ok(rows) => {
                    debug!(
                        "{} returned {} rows for {} ({} to {})",
                        self.provider_id(),
                        rows.len(),
                        instrument,
                        start,
                        end
                    );
                    return Ok(rows);
                }
                Err(e) if e.retry_class() == RetryClass::WithBackoff && attempt < self.max_retries => {
                    let delay = backoff_delay(self.retry_backoff, attempt);
                    attempt += 1;
                    warn!(
                        "Transient error fetching {} (attempt {}/{}): {}. Retrying in {:?}",
                        instrument,
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn fetch_once(
        &mut self,
        instrument: &InstrumentId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceRow>, MarketDataError> {
        self.respect_min_delay().await;
        self.last_request = Some(Instant::now());

        match tokio::time::timeout(
            self.timeout,
            self.provider
                .get_daily_prices(instrument.as_str(), start, end),
        )
        .await
        {
            Ok(result) => match result {
                Err(MarketDataError::NoDataForRange) => Ok(vec![]),
                other => other,
            },
            Err(_) => Err(MarketDataError::Timeout {
                provider: self.provider_id().to_string(),
            }),
        }
    }

    async fn respect_min_delay(&self) {
        let min_delay = self.provider.rate_limit().min_delay;
        if let Some(last) = self.last_request {
            let ready_at = last + min_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(2u32.saturating_pow(attempt))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::testing::{MockProvider, MockResponse};
    use pricevault_market_data::RawPriceRow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn settings() -> SyncSettings {
        SyncSettings {
            fetch_timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
            ..SyncSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_then_succeeds() {
        let provider = MockProvider::new();
        provider.respond(
            "SPY",
            vec![
                MockResponse::RateLimited,
                MockResponse::RateLimited,
                MockResponse::Rows(vec![RawPriceRow::text("2024-01-02", 470.0)]),
            ],
        );
        let mut client = MarketDataClient::new(Arc::new(provider.clone()), &settings());

        let rows = client
            .fetch_daily_prices(&InstrumentId::new("SPY"), day(2024, 1, 1), day(2024, 1, 2))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let provider = MockProvider::new();
        provider.respond("SPY", vec![MockResponse::RateLimited]);
        let mut client = MarketDataClient::new(Arc::new(provider.clone()), &settings());

        let err = client
            .fetch_daily_prices(&InstrumentId::new("SPY"), day(2024, 1, 1), day(2024, 1, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceFetchError::RateLimitExceeded(_)));
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_errors_are_not_retried() {
        let provider = MockProvider::new();
        provider.respond("XYZ", vec![MockResponse::NotFound]);
        let mut client = MarketDataClient::new(Arc::new(provider.clone()), &settings());

        let err = client
            .fetch_daily_prices(&InstrumentId::new("XYZ"), day(2024, 1, 1), day(2024, 1, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceFetchError::NotFound(_)));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_answer_is_no_data() {
        let provider = MockProvider::new();
        provider.respond("SPY", vec![MockResponse::Rows(vec![])]);
        let mut client = MarketDataClient::new(Arc::new(provider), &settings());

        let err = client
            .fetch_daily_prices(&InstrumentId::new("SPY"), day(2024, 1, 1), day(2024, 1, 2))
            .await
            .unwrap_err();

        assert_eq!(err, SourceFetchError::NoData);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out() {
        let provider = MockProvider::new();
        provider.respond("SPY", vec![MockResponse::Hang]);
        let mut client = MarketDataClient::new(
            Arc::new(provider.clone()),
            &SyncSettings {
                max_retries: 0,
                ..settings()
            },
        );

        let err = client
            .fetch_daily_prices(&InstrumentId::new("SPY"), day(2024, 1, 1), day(2024, 1, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, SourceFetchError::Timeout(_)));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), base);
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
        assert_eq!(backoff_delay(Duration::from_secs(u64::MAX / 2), 2), Duration::MAX);
        assert_eq!(
            backoff_delay(Duration::from_secs(1), 40),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }
}
