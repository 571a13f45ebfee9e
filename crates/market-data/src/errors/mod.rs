//! Source-side failures and how a caller should react to them.

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// A failed daily-history request.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The source does not know this symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The symbol is known but the source has no rows in the range.
    #[error("No prices in requested range")]
    NoDataForRange,

    /// HTTP 429 or an equivalent quota response.
    #[error("{provider} rate limited the request")]
    RateLimited { provider: String },

    #[error("{provider} did not answer in time")]
    Timeout { provider: String },

    /// Anything the source reported that does not fit the variants above,
    /// including responses that could not be decoded.
    #[error("{provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Whether repeating the same request can succeed.
    ///
    /// ```
    /// use pricevault_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let quota = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(quota.retry_class(), RetryClass::WithBackoff);
    /// assert_eq!(MarketDataError::NoDataForRange.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => RetryClass::WithBackoff,
            Self::Network(e) if e.is_timeout() || e.is_connect() => RetryClass::WithBackoff,
            Self::SymbolNotFound(_)
            | Self::NoDataForRange
            | Self::ProviderError { .. }
            | Self::Network(_) => RetryClass::Never,
        }
    }

    /// True when the symbol or range is answered for good, even if empty.
    pub fn is_terminal(&self) -> bool {
        self.retry_class() == RetryClass::Never
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yahoo() -> String {
        "YAHOO".to_string()
    }

    #[test]
    fn test_quota_and_timeout_are_retried() {
        for err in [
            MarketDataError::RateLimited { provider: yahoo() },
            MarketDataError::Timeout { provider: yahoo() },
        ] {
            assert_eq!(err.retry_class(), RetryClass::WithBackoff, "{}", err);
            assert!(!err.is_terminal());
        }
    }

    #[test]
    fn test_answered_requests_are_terminal() {
        for err in [
            MarketDataError::SymbolNotFound("VWCE.XX".to_string()),
            MarketDataError::NoDataForRange,
            MarketDataError::ProviderError {
                provider: yahoo(),
                message: "malformed chart payload".to_string(),
            },
        ] {
            assert!(err.is_terminal(), "{}", err);
        }
    }

    #[test]
    fn test_messages_name_the_provider() {
        let err = MarketDataError::ProviderError {
            provider: yahoo(),
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "YAHOO failed: bad gateway");
        assert_eq!(
            MarketDataError::Timeout { provider: yahoo() }.to_string(),
            "YAHOO did not answer in time"
        );
    }
}
