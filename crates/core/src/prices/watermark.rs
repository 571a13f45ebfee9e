//! High-water mark resolution.
//!
//! The watermark of an instrument is the latest day already stored for it.
//! It is derived on demand from the store and never persisted.

use chrono::NaiveDate;
use log::debug;
use std::fmt;

use super::model::InstrumentId;
use super::store::TimeSeriesStore;
use crate::errors::Result;

/// Where the next fetch for an instrument starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    /// Latest day present in the store.
    Stored(NaiveDate),
    /// No stored rows; the configured start of record.
    Default(NaiveDate),
}

impl Watermark {
    pub fn date(&self) -> NaiveDate {
        match self {
            Watermark::Stored(d) | Watermark::Default(d) => *d,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Watermark::Default(_))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watermark::Stored(d) => write!(f, "{}", d),
            Watermark::Default(d) => write!(f, "{} (start of record)", d),
        }
    }
}

/// Computes watermarks from a store.
#[derive(Debug, Clone)]
pub struct WatermarkResolver {
    default_start: NaiveDate,
}

impl WatermarkResolver {
    pub fn new(default_start: NaiveDate) -> Self {
        Self { default_start }
    }

    pub fn default_start(&self) -> NaiveDate {
        self.default_start
    }

    /// Resolve the watermark for `instrument`.
    ///
    /// A corrupt stored date is returned as an error, never defaulted: a
    /// silent fallback to the start of record would turn an incremental sync
    /// into a full history download.
    pub fn resolve<S>(&self, store: &S, instrument: &InstrumentId) -> Result<Watermark>
    where
        S: TimeSeriesStore + ?Sized,
    {
        let existing = store.get_existing(instrument)?;
        let watermark = match existing.iter().map(|p| p.date).max() {
            Some(latest) => Watermark::Stored(latest),
            None => Watermark::Default(self.default_start),
        };
        debug!(
            "Watermark for {} is {} ({} stored rows)",
            instrument,
            watermark,
            existing.len()
        );
        Ok(watermark)
    }
}
