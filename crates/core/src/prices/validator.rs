//! Validation of raw rows returned by the market data source.
//!
//! Each raw row is judged on its own and yields either an [`Observation`] or
//! a [`SkipReason`]. A bad row never aborts the rest of the batch; skips are
//! collected into a [`ValidationReport`] instead of being printed.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::fmt;

use pricevault_market_data::{RawDate, RawPriceRow};

use super::model::{InstrumentId, Observation};

/// Why a raw row was not turned into an observation.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The date could not be normalized to a calendar day.
    UnparsableDate(String),
    /// The source reported no price for the day.
    MissingPrice,
    /// The price was NaN or infinite.
    NonFinitePrice(f64),
    /// The price was below zero and negative prices are rejected.
    NegativePrice(f64),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnparsableDate(raw) => write!(f, "Unparsable date '{}'", raw),
            SkipReason::MissingPrice => write!(f, "Missing price"),
            SkipReason::NonFinitePrice(p) => write!(f, "Non-finite price {}", p),
            SkipReason::NegativePrice(p) => write!(f, "Negative price {}", p),
        }
    }
}

/// Outcome of validating one raw row.
pub type RowValidation = Result<Observation, SkipReason>;

/// A raw row that was dropped, with its position in the source batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub index: usize,
    pub row: RawPriceRow,
    pub reason: SkipReason,
}

/// Result of validating a batch of raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Valid observations, in source order.
    pub observations: Vec<Observation>,
    /// Rows that were skipped.
    pub skipped: Vec<SkippedRow>,
}

impl ValidationReport {
    pub fn total(&self) -> usize {
        self.observations.len() + self.skipped.len()
    }
}

/// Validator configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Whether to reject rows with a price below zero.
    pub reject_negative_prices: bool,
}

/// Filters and normalizes raw rows into observations.
#[derive(Debug, Clone, Default)]
pub struct ObservationValidator {
    config: ValidatorConfig,
}

impl ObservationValidator {
    /// Create a new validator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate one raw row.
    pub fn validate_row(&self, instrument: &InstrumentId, row: &RawPriceRow) -> RowValidation {
        let date = normalize_date(&row.date)
            .ok_or_else(|| SkipReason::UnparsableDate(row.date.to_string()))?;

        let price = row.price.ok_or(SkipReason::MissingPrice)?;
        if !price.is_finite() {
            return Err(SkipReason::NonFinitePrice(price));
        }
        if self.config.reject_negative_prices && price < 0.0 {
            return Err(SkipReason::NegativePrice(price));
        }

        Observation::new(instrument.clone(), date, price)
            .map_err(|_| SkipReason::NonFinitePrice(price))
    }

    /// Validate a batch of raw rows for one instrument.
    pub fn validate(&self, instrument: &InstrumentId, rows: &[RawPriceRow]) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (index, row) in rows.iter().enumerate() {
            match self.validate_row(instrument, row) {
                Ok(observation) => report.observations.push(observation),
                Err(reason) => {
                    debug!("Skipping row {} for {}: {}", index, instrument, reason);
                    report.skipped.push(SkippedRow {
                        index,
                        row: row.clone(),
                        reason,
                    });
                }
            }
        }

        if !report.skipped.is_empty() {
            warn!(
                "Skipped {} of {} rows for {}",
                report.skipped.len(),
                report.total(),
                instrument
            );
        }

        report
    }
}

/// Normalize a raw source date to a calendar day.
///
/// Accepted shapes: `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DDTHH:MM:SS`, RFC 3339 (the day as written, offset ignored) and
/// Unix timestamps (UTC day).
pub fn normalize_date(raw: &RawDate) -> Option<NaiveDate> {
    match raw {
        RawDate::Timestamp(ts) => DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()),
        RawDate::Text(text) => {
            let text = text.trim();
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                return Some(date);
            }
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y/%m/%d") {
                return Some(date);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.date_naive());
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        }
    }
}
