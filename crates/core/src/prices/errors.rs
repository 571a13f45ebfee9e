//! Market data source error types.

use thiserror::Error;

use pricevault_market_data::errors::{MarketDataError, RetryClass};

/// A failed or empty fetch for one instrument.
///
/// This error type bridges between the market-data crate's provider errors
/// and the sync orchestrator, which contains it at the instrument boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceFetchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No data found")]
    NoData,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl SourceFetchError {
    /// Returns true if this error is transient and should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceFetchError::RateLimitExceeded(_) | SourceFetchError::Timeout(_)
        )
    }
}

impl From<MarketDataError> for SourceFetchError {
    fn from(error: MarketDataError) -> Self {
        let transient = error.retry_class() == RetryClass::WithBackoff;
        match error {
            MarketDataError::SymbolNotFound(symbol) => {
                SourceFetchError::NotFound(format!("Symbol not found: {}", symbol))
            }
            MarketDataError::NoDataForRange => SourceFetchError::NoData,
            MarketDataError::RateLimited { provider } => {
                SourceFetchError::RateLimitExceeded(provider)
            }
            MarketDataError::Timeout { provider } => SourceFetchError::Timeout(provider),
            MarketDataError::ProviderError { provider, message } => {
                SourceFetchError::ProviderError(format!("{}: {}", provider, message))
            }
            MarketDataError::Network(e) if transient => SourceFetchError::Timeout(e.to_string()),
            MarketDataError::Network(e) => SourceFetchError::NetworkError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_market_data_error() {
        assert_eq!(
            SourceFetchError::from(MarketDataError::NoDataForRange),
            SourceFetchError::NoData
        );
        let err = SourceFetchError::from(MarketDataError::RateLimited {
            provider: "YAHOO".to_string(),
        });
        assert!(err.is_transient());
        let err = SourceFetchError::from(MarketDataError::SymbolNotFound("XYZ".to_string()));
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Not found: Symbol not found: XYZ");
    }
}
