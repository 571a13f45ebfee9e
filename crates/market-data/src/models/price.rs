use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The date of a raw row, exactly as the source produced it.
///
/// Providers report dates in whatever shape their API uses; normalization to
/// a calendar day happens downstream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawDate {
    /// Textual date, e.g. `2024-01-02` or `2024-01-02T00:00:00Z`.
    Text(String),
    /// Unix timestamp in seconds (UTC).
    Timestamp(i64),
}

impl fmt::Display for RawDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawDate::Text(s) => write!(f, "{}", s),
            RawDate::Timestamp(ts) => write!(f, "@{}", ts),
        }
    }
}

/// One unvalidated daily price row returned by a provider.
///
/// `price` is `None` when the provider reported a null for the day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    pub date: RawDate,
    pub price: Option<f64>,
}

impl RawPriceRow {
    pub fn new(date: RawDate, price: Option<f64>) -> Self {
        Self { date, price }
    }

    /// Convenience constructor for a textual date and a present price.
    pub fn text(date: impl Into<String>, price: f64) -> Self {
        Self {
            date: RawDate::Text(date.into()),
            price: Some(price),
        }
    }
}

/// Which price column a provider should report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceField {
    /// Adjusted close, falling back to the plain close when the provider has
    /// no usable adjusted value for the day.
    #[default]
    AdjustedClose,
    /// Plain (unadjusted) close.
    Close,
}

impl FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adjclose" | "adj_close" | "adjusted" => Ok(PriceField::AdjustedClose),
            "close" => Ok(PriceField::Close),
            other => Err(format!(
                "unknown price field '{}', expected 'adjclose' or 'close'",
                other
            )),
        }
    }
}
