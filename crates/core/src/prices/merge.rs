//! Merging validated observations into a store.
//!
//! Conflict policy is last-write-wins: a fetched value unconditionally
//! replaces whatever is stored under the same `(instrument, date)` key. No
//! field-level merge, no versioning, no history of replaced values.

use log::debug;

use super::model::{InstrumentId, Observation, PricePoint};
use super::store::TimeSeriesStore;
use crate::errors::{Result, ValidationError};

/// What a merge did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys that did not exist before.
    pub inserted: usize,
    /// Keys whose price changed.
    pub replaced: usize,
    /// Keys rewritten with the price they already had.
    pub unchanged: usize,
}

impl MergeStats {
    /// Number of keys whose stored value actually changed.
    pub fn changed(&self) -> usize {
        self.inserted + self.replaced
    }

    pub fn total(&self) -> usize {
        self.inserted + self.replaced + self.unchanged
    }

    fn record(&mut self, previous: Option<f64>, price: f64) {
        match previous {
            None => self.inserted += 1,
            Some(p) if p == price => self.unchanged += 1,
            Some(_) => self.replaced += 1,
        }
    }
}

/// Applies observations to a store via upsert.
pub struct MergeEngine;

impl MergeEngine {
    /// Upsert every observation for `instrument` into `store`, in order.
    ///
    /// Observations for another instrument are refused before anything is
    /// written. When the same date appears twice, the later one wins.
    pub fn merge<S>(
        store: &mut S,
        instrument: &InstrumentId,
        observations: &[Observation],
    ) -> Result<MergeStats>
    where
        S: TimeSeriesStore + ?Sized,
    {
        if let Some(stray) = observations.iter().find(|o| o.instrument() != instrument) {
            return Err(ValidationError::InvalidInput(format!(
                "observation for {} cannot be merged into {}",
                stray.instrument(),
                instrument
            ))
            .into());
        }

        let points: Vec<PricePoint> = observations.iter().map(Observation::point).collect();
        let previous = store.upsert_many(instrument, &points)?;

        let mut stats = MergeStats::default();
        for (point, prev) in points.iter().zip(previous) {
            stats.record(prev, point.price);
        }

        debug!(
            "Merged {} observations for {}: {} inserted, {} replaced, {} unchanged",
            stats.total(),
            instrument,
            stats.inserted,
            stats.replaced,
            stats.unchanged
        );

        Ok(stats)
    }
}
