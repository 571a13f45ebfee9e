//! Domain models for stored daily prices.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::DAY_FORMAT;
use crate::errors::ValidationError;

// =============================================================================
// InstrumentId
// =============================================================================

/// Tracked instrument identifier, usually a ticker symbol.
///
/// Examples: "SPY", "IWDA.AS", "BTC-USD"
///
/// Identifiers are opaque: they are case- and format-sensitive and compared
/// by exact equality. No normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct InstrumentId(pub String);

impl InstrumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for InstrumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for InstrumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Day keys
// =============================================================================

/// Format a day in the canonical `YYYY-MM-DD` key form.
pub fn format_day(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

/// Parse a stored day key. Only the canonical form produced by
/// [`format_day`] is accepted: `2024-1-2` would otherwise sit next to
/// `2024-01-02` as a second key for the same day.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .ok()
        .filter(|date| format_day(*date) == value)
}

// =============================================================================
// Observation
// =============================================================================

/// One stored (date, price) pair for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// A single (instrument, date, price) fact.
///
/// The price is always finite: the only constructor rejects NaN and
/// infinities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    instrument: InstrumentId,
    date: NaiveDate,
    price: f64,
}

impl Observation {
    pub fn new(
        instrument: InstrumentId,
        date: NaiveDate,
        price: f64,
    ) -> Result<Self, ValidationError> {
        ensure_finite(&instrument, date, price)?;
        Ok(Self {
            instrument,
            date,
            price,
        })
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn point(&self) -> PricePoint {
        PricePoint::new(self.date, self.price)
    }
}

/// Rejects NaN and infinite prices.
pub fn ensure_finite(
    instrument: &InstrumentId,
    date: NaiveDate,
    price: f64,
) -> Result<(), ValidationError> {
    if price.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinitePrice {
            instrument: instrument.to_string(),
            date: format_day(date),
            price,
        })
    }
}

// =============================================================================
// Store summaries
// =============================================================================

/// Row count and date bounds for one instrument in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentSummary {
    pub instrument: InstrumentId,
    pub rows: usize,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
}
