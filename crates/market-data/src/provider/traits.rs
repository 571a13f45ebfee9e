//! The contract every daily price source fulfils.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::MarketDataError;
use crate::models::RawPriceRow;

use super::capabilities::RateLimit;

/// A source of end-of-day prices keyed by symbol.
///
/// Providers do no validation: rows come back as the source sent them, and
/// the caller decides what to keep. Retries and timeouts are also the
/// caller's job; a provider reports one attempt.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short constant name such as `"YAHOO"`, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Minimum spacing between requests; 100 ms unless overridden.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Fetch daily prices for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - The ticker symbol, passed through verbatim
    /// * `start` - First calendar day of the range (inclusive)
    /// * `end` - Last calendar day of the range (inclusive)
    ///
    /// # Returns
    ///
    /// The rows the source reported, unvalidated, or a `MarketDataError` on
    /// failure. An empty vector is a legal answer.
    async fn get_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceRow>, MarketDataError>;
}
