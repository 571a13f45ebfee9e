//! Time-series storage trait.
//!
//! This module defines the storage interface for daily price observations.
//! The trait abstracts the persistence layer so that the document backend
//! (`storage-json`) and the table backend (`storage-sqlite`) can be used
//! interchangeably: the backend is picked once, at construction time, and
//! nothing downstream branches on which one it is.
//!
//! # Contract
//!
//! - The key is `(instrument, date)`; at most one price exists per key.
//! - `upsert` on an existing key replaces the price (last write wins) and is
//!   idempotent.
//! - There is no delete: a store only grows or updates in place.
//! - Non-finite prices are rejected before they reach the backing medium.

use chrono::NaiveDate;

use super::model::{InstrumentId, InstrumentSummary, PricePoint};
use crate::errors::Result;

/// Storage interface for daily price observations.
///
/// Mutating methods take `&mut self`: a store is exclusively owned by one
/// sync run, and serialized mutation is part of the contract.
pub trait TimeSeriesStore: Send {
    /// Short backend name used in logs ("json", "sqlite", ...).
    fn backend_name(&self) -> &'static str;

    /// Gets all stored observations for one instrument, ordered by date
    /// ascending.
    ///
    /// An unknown instrument yields an empty vector, not an error. A stored
    /// date that is not a calendar day yields
    /// [`ValidationError::CorruptStoredDate`](crate::errors::ValidationError::CorruptStoredDate).
    fn get_existing(&self, instrument: &InstrumentId) -> Result<Vec<PricePoint>>;

    /// Inserts or overwrites the price at `(instrument, date)`.
    ///
    /// # Returns
    ///
    /// The price previously stored under the key, if any.
    fn upsert(&mut self, instrument: &InstrumentId, date: NaiveDate, price: f64)
        -> Result<Option<f64>>;

    /// Upserts several points for one instrument, in order.
    ///
    /// Backends with transactional row writes override this to apply the
    /// whole batch atomically. The default applies `upsert` point by point.
    fn upsert_many(
        &mut self,
        instrument: &InstrumentId,
        points: &[PricePoint],
    ) -> Result<Vec<Option<f64>>> {
        points
            .iter()
            .map(|p| self.upsert(instrument, p.date, p.price))
            .collect()
    }

    /// Makes every upsert so far durable.
    ///
    /// Failure is a [`DatabaseError::WriteFailed`](crate::errors::DatabaseError::WriteFailed);
    /// the in-memory state is left untouched so the call can be retried.
    fn persist(&mut self) -> Result<()>;

    /// Lists every instrument with at least one stored row, sorted.
    fn instruments(&self) -> Result<Vec<InstrumentId>>;

    /// Per-instrument row count and date bounds.
    fn summarize(&self) -> Result<Vec<InstrumentSummary>> {
        self.instruments()?
            .into_iter()
            .map(|instrument| {
                let points = self.get_existing(&instrument)?;
                Ok(InstrumentSummary {
                    rows: points.len(),
                    first: points.first().map(|p| p.date),
                    last: points.last().map(|p| p.date),
                    instrument,
                })
            })
            .collect()
    }

    /// Diagnostic recorded when the backing medium was unreadable on open
    /// and the store started empty instead.
    fn load_warning(&self) -> Option<&str> {
        None
    }
}

impl<T: TimeSeriesStore + ?Sized> TimeSeriesStore for Box<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn get_existing(&self, instrument: &InstrumentId) -> Result<Vec<PricePoint>> {
        (**self).get_existing(instrument)
    }

    fn upsert(
        &mut self,
        instrument: &InstrumentId,
        date: NaiveDate,
        price: f64,
    ) -> Result<Option<f64>> {
        (**self).upsert(instrument, date, price)
    }

    fn upsert_many(
        &mut self,
        instrument: &InstrumentId,
        points: &[PricePoint],
    ) -> Result<Vec<Option<f64>>> {
        (**self).upsert_many(instrument, points)
    }

    fn persist(&mut self) -> Result<()> {
        (**self).persist()
    }

    fn instruments(&self) -> Result<Vec<InstrumentId>> {
        (**self).instruments()
    }

    fn summarize(&self) -> Result<Vec<InstrumentSummary>> {
        (**self).summarize()
    }

    fn load_warning(&self) -> Option<&str> {
        (**self).load_warning()
    }
}
