//! Yahoo Finance market data provider.
//!
//! This provider uses the Yahoo Finance chart API to fetch daily prices for
//! equities and ETFs (e.g., SPY, IWDA.AS).

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::{PriceField, RawDate, RawPriceRow};
use crate::provider::{MarketDataProvider, RateLimit};

const PROVIDER_ID: &str = "YAHOO";

/// Yahoo Finance market data provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    price_field: PriceField,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider reporting the given price column.
    pub fn new(price_field: PriceField) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        Ok(Self {
            connector,
            price_field,
        })
    }

    /// Start of `day` in UTC.
    fn day_start(day: NaiveDate) -> OffsetDateTime {
        let ts = day
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        OffsetDateTime::from_unix_timestamp(ts).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Last second of `day` in UTC, so the request includes `day` itself.
    fn day_end(day: NaiveDate) -> OffsetDateTime {
        let ts = day
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        OffsetDateTime::from_unix_timestamp(ts).unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    fn map_yahoo_error(symbol: &str, error: yahoo::YahooError) -> MarketDataError {
        match error {
            yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
                MarketDataError::SymbolNotFound(symbol.to_string())
            }
            other => {
                let message = other.to_string();
                if message.contains("429") || message.contains("Too Many Requests") {
                    MarketDataError::RateLimited {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::ProviderError {
                        provider: PROVIDER_ID.to_string(),
                        message,
                    }
                }
            }
        }
    }

    /// Convert a Yahoo quote to a raw row.
    fn yahoo_quote_to_row(&self, quote: &yahoo::Quote) -> RawPriceRow {
        RawPriceRow::new(
            RawDate::Timestamp(quote.timestamp as i64),
            select_price(self.price_field, quote.adjclose, quote.close),
        )
    }
}

/// Pick the reported price for a day.
///
/// The adjusted close wins when it is a usable number; otherwise the plain
/// close is reported as-is and left for validation downstream.
fn select_price(field: PriceField, adjclose: f64, close: f64) -> Option<f64> {
    match field {
        PriceField::AdjustedClose if adjclose.is_finite() && adjclose != 0.0 => Some(adjclose),
        PriceField::AdjustedClose | PriceField::Close => Some(close),
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            min_delay: Duration::from_millis(250),
        }
    }

    async fn get_daily_prices(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceRow>, MarketDataError> {
        debug!(
            "Fetching daily prices for {} from {} to {} from Yahoo",
            symbol, start, end
        );

        let response = self
            .connector
            .get_quote_history(symbol, Self::day_start(start), Self::day_end(end))
            .await
            .map_err(|e| Self::map_yahoo_error(symbol, e))?;

        match response.quotes() {
            Ok(quotes) => Ok(quotes
                .iter()
                .map(|q| self.yahoo_quote_to_row(q))
                .collect()),
            Err(yahoo::YahooError::NoQuotes) => {
                warn!(
                    "No daily prices returned for '{}' between {} and {}",
                    symbol, start, end
                );
                Ok(vec![])
            }
            Err(e) => Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_price_prefers_adjusted_close() {
        assert_eq!(select_price(PriceField::AdjustedClose, 98.5, 100.0), Some(98.5));
    }

    #[test]
    fn test_select_price_falls_back_to_close() {
        assert_eq!(
            select_price(PriceField::AdjustedClose, f64::NAN, 100.0),
            Some(100.0)
        );
        assert_eq!(select_price(PriceField::AdjustedClose, 0.0, 100.0), Some(100.0));
    }

    #[test]
    fn test_select_price_close_ignores_adjusted() {
        assert_eq!(select_price(PriceField::Close, 98.5, 100.0), Some(100.0));
    }

    #[test]
    fn test_request_window_covers_whole_days() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let start = YahooProvider::day_start(day);
        let end = YahooProvider::day_end(day);
        assert_eq!(start.unix_timestamp(), 1704153600);
        assert_eq!(end.unix_timestamp() - start.unix_timestamp(), 86_399);
    }

    #[test]
    fn test_request_window_before_epoch() {
        let day = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        assert!(YahooProvider::day_start(day).unix_timestamp() < 0);
    }
}
