//! Price synchronization orchestrator.
//!
//! This module provides the [`SyncOrchestrator`], which runs one sync pass
//! over the tracked instruments, one instrument at a time.
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator
//!       │
//!       ├─► FetchPlanner (watermark → fetch range)
//!       ├─► MarketDataClient (fetch raw rows via market-data crate)
//!       ├─► ObservationValidator (raw rows → observations + skips)
//!       ├─► MergeEngine (last-write-wins upsert)
//!       └─► TimeSeriesStore (persist once at the end of the run)
//! ```
//!
//! # Failure policy
//!
//! Every instrument-scoped error is contained here: the instrument ends in
//! [`InstrumentState::Failed`] and the loop moves on. Only a failed
//! [`TimeSeriesStore::persist`] fails the run, as a [`SyncRunError`] that
//! still carries the per-instrument report.

use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use std::fmt;
use thiserror::Error;

use super::client::MarketDataClient;
use super::merge::{MergeEngine, MergeStats};
use super::model::InstrumentId;
use super::planner::FetchPlanner;
use super::store::TimeSeriesStore;
use super::validator::{ObservationValidator, SkippedRow, ValidatorConfig};
use super::watermark::WatermarkResolver;
use crate::config::SyncSettings;
use crate::errors::Error;
use crate::instruments::TrackedInstruments;

// =============================================================================
// Instrument state machine
// =============================================================================

/// Lifecycle of one instrument within a run.
///
/// `Pending → Fetching → Validating → Merging → Done`, with `Failed`
/// reachable from `Fetching` or any later state. Resolving the watermark and
/// planning the range belong to `Fetching`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentState {
    Pending,
    Fetching,
    Validating,
    Merging,
    Done,
    Failed,
}

impl InstrumentState {
    pub fn can_transition_to(self, next: InstrumentState) -> bool {
        use InstrumentState::*;
        matches!(
            (self, next),
            (Pending, Fetching)
                | (Fetching, Validating)
                | (Validating, Merging)
                | (Merging, Done)
                // Nothing to fetch, or nothing new after merging.
                | (Fetching, Done)
                | (Fetching, Failed)
                | (Validating, Failed)
                | (Merging, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InstrumentState::Done | InstrumentState::Failed)
    }
}

impl fmt::Display for InstrumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentState::Pending => "pending",
            InstrumentState::Fetching => "fetching",
            InstrumentState::Validating => "validating",
            InstrumentState::Merging => "merging",
            InstrumentState::Done => "done",
            InstrumentState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Sync Result Types
// =============================================================================

/// What happened to one instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    /// At least one stored value was inserted or changed.
    Updated {
        fetched: usize,
        inserted: usize,
        replaced: usize,
        unchanged: usize,
        skipped_rows: usize,
    },
    /// The store already held everything the source returned, or there was
    /// nothing to ask for.
    NoNewData {
        fetched: usize,
        unchanged: usize,
        skipped_rows: usize,
    },
    /// The pipeline for this instrument stopped in `stage`.
    Failed {
        stage: InstrumentState,
        reason: String,
    },
}

impl InstrumentOutcome {
    fn from_merge(fetched: usize, skipped_rows: usize, stats: MergeStats) -> Self {
        if stats.changed() == 0 {
            InstrumentOutcome::NoNewData {
                fetched,
                unchanged: stats.unchanged,
                skipped_rows,
            }
        } else {
            InstrumentOutcome::Updated {
                fetched,
                inserted: stats.inserted,
                replaced: stats.replaced,
                unchanged: stats.unchanged,
                skipped_rows,
            }
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, InstrumentOutcome::Updated { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, InstrumentOutcome::Failed { .. })
    }

    /// Number of stored values inserted or changed.
    pub fn changed(&self) -> usize {
        match self {
            InstrumentOutcome::Updated {
                inserted, replaced, ..
            } => inserted + replaced,
            _ => 0,
        }
    }
}

impl fmt::Display for InstrumentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentOutcome::Updated {
                fetched,
                inserted,
                replaced,
                skipped_rows,
                ..
            } => write!(
                f,
                "updated ({} fetched, {} new, {} revised, {} skipped)",
                fetched, inserted, replaced, skipped_rows
            ),
            InstrumentOutcome::NoNewData { fetched, .. } => {
                write!(f, "no new data ({} fetched)", fetched)
            }
            InstrumentOutcome::Failed { stage, reason } => {
                write!(f, "failed while {}: {}", stage, reason)
            }
        }
    }
}

/// Result of the sync for a single instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: InstrumentId,
    /// Terminal state: `Done` or `Failed`.
    pub state: InstrumentState,
    /// Requested range, when a request was made.
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub outcome: InstrumentOutcome,
    /// Raw rows dropped by validation.
    pub skipped: Vec<SkippedRow>,
}

/// Overall status of a run whose store was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// At least one instrument produced new data.
    Updated,
    /// No instrument produced new data.
    NothingUpdated,
}

/// Aggregate result of one sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Per-instrument reports, in tracking order.
    pub instruments: Vec<InstrumentReport>,
    /// Diagnostic from a store that was unreadable on open.
    pub store_warning: Option<String>,
    /// Whether the final persist succeeded.
    pub persisted: bool,
}

impl SyncReport {
    pub fn updated_count(&self) -> usize {
        self.count(InstrumentOutcome::is_updated)
    }

    pub fn failed_count(&self) -> usize {
        self.count(InstrumentOutcome::is_failed)
    }

    pub fn no_new_data_count(&self) -> usize {
        self.count(|o| matches!(o, InstrumentOutcome::NoNewData { .. }))
    }

    /// Total stored values inserted or changed across instruments.
    pub fn observations_changed(&self) -> usize {
        self.instruments.iter().map(|r| r.outcome.changed()).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InstrumentReport> {
        self.instruments.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn get(&self, instrument: &InstrumentId) -> Option<&InstrumentReport> {
        self.instruments.iter().find(|r| &r.instrument == instrument)
    }

    pub fn status(&self) -> RunStatus {
        if self.updated_count() > 0 {
            RunStatus::Updated
        } else {
            RunStatus::NothingUpdated
        }
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        match self.status() {
            RunStatus::Updated => format!(
                "Updated {} of {} instruments ({} observations changed), {} with no new data, {} failed",
                self.updated_count(),
                self.instruments.len(),
                self.observations_changed(),
                self.no_new_data_count(),
                self.failed_count()
            ),
            RunStatus::NothingUpdated => format!(
                "Nothing updated: none of {} instruments produced new data ({} failed)",
                self.instruments.len(),
                self.failed_count()
            ),
        }
    }

    fn count(&self, predicate: impl Fn(&InstrumentOutcome) -> bool) -> usize {
        self.instruments
            .iter()
            .filter(|r| predicate(&r.outcome))
            .count()
    }
}

/// A run whose store could not be persisted.
///
/// The in-memory store is still owned by the orchestrator; calling
/// [`SyncOrchestrator::persist`] again retries the write.
#[derive(Debug, Error)]
#[error("Sync run failed: {source}")]
pub struct SyncRunError {
    pub report: SyncReport,
    #[source]
    pub source: Error,
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

/// Tracks one instrument through the state machine.
struct Progress<'a> {
    instrument: &'a InstrumentId,
    state: InstrumentState,
}

impl<'a> Progress<'a> {
    fn new(instrument: &'a InstrumentId) -> Self {
        Self {
            instrument,
            state: InstrumentState::Pending,
        }
    }

    fn advance(&mut self, next: InstrumentState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!("{}: {} -> {}", self.instrument, self.state, next);
        self.state = next;
    }

    fn fail(&mut self, reason: String) -> InstrumentOutcome {
        let stage = self.state;
        self.advance(InstrumentState::Failed);
        InstrumentOutcome::Failed { stage, reason }
    }
}

/// Runs sync passes over a store it exclusively owns.
pub struct SyncOrchestrator<S: TimeSeriesStore> {
    store: S,
    client: MarketDataClient,
    instruments: TrackedInstruments,
    planner: FetchPlanner,
    validator: ObservationValidator,
}

impl<S: TimeSeriesStore> SyncOrchestrator<S> {
    pub fn new(
        store: S,
        client: MarketDataClient,
        instruments: TrackedInstruments,
        settings: &SyncSettings,
    ) -> Self {
        Self {
            store,
            client,
            instruments,
            planner: FetchPlanner::new(WatermarkResolver::new(settings.default_start_date)),
            validator: ObservationValidator::with_config(ValidatorConfig {
                reject_negative_prices: settings.reject_negative_prices,
            }),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Persist the store. Used to retry after a [`SyncRunError`].
    pub fn persist(&mut self) -> crate::errors::Result<()> {
        self.store.persist()
    }

    /// Run one sync pass with today's UTC date as the end of every range.
    pub async fn run(&mut self) -> Result<SyncReport, SyncRunError> {
        self.run_as_of(Utc::now().date_naive()).await
    }

    /// Run one sync pass with `today` as the end of every range.
    pub async fn run_as_of(&mut self, today: NaiveDate) -> Result<SyncReport, SyncRunError> {
        let mut report = SyncReport::default();

        if let Some(warning) = self.store.load_warning() {
            warn!(
                "{} store started empty after a read failure: {}",
                self.store.backend_name(),
                warning
            );
            report.store_warning = Some(warning.to_string());
        }

        info!(
            "Syncing {} instruments into {} store (as of {})",
            self.instruments.len(),
            self.store.backend_name(),
            today
        );

        let instruments: Vec<InstrumentId> = self.instruments.iter().cloned().collect();
        for instrument in &instruments {
            let instrument_report = self.sync_instrument(instrument, today).await;
            match &instrument_report.outcome {
                InstrumentOutcome::Failed { .. } => {
                    error!("{}: {}", instrument, instrument_report.outcome)
                }
                outcome => info!("{}: {}", instrument, outcome),
            }
            report.instruments.push(instrument_report);
        }

        if let Err(e) = self.store.persist() {
            error!("Failed to persist {} store: {}", self.store.backend_name(), e);
            return Err(SyncRunError { report, source: e });
        }
        report.persisted = true;

        info!("{}", report.summary());
        Ok(report)
    }

    async fn sync_instrument(
        &mut self,
        instrument: &InstrumentId,
        today: NaiveDate,
    ) -> InstrumentReport {
        let mut progress = Progress::new(instrument);
        let mut range = None;
        let mut skipped = Vec::new();

        progress.advance(InstrumentState::Fetching);
        let outcome = 'pipeline: {
            let plan = match self.planner.plan(&self.store, instrument, today) {
                Ok(Some(plan)) => plan,
                Ok(None) => {
                    progress.advance(InstrumentState::Done);
                    break 'pipeline InstrumentOutcome::NoNewData {
                        fetched: 0,
                        unchanged: 0,
                        skipped_rows: 0,
                    };
                }
                Err(e) => {
                    break 'pipeline progress.fail(format!("cannot resolve watermark: {}", e))
                }
            };
            debug!(
                "{}: watermark {}, requesting {} to {}",
                instrument, plan.watermark, plan.start, plan.end
            );
            range = Some((plan.start, plan.end));

            let rows = match self
                .client
                .fetch_daily_prices(instrument, plan.start, plan.end)
                .await
            {
                Ok(rows) => rows,
                Err(e) => break 'pipeline progress.fail(e.to_string()),
            };
            let fetched = rows.len();

            progress.advance(InstrumentState::Validating);
            let validation = self.validator.validate(instrument, &rows);
            skipped = validation.skipped;
            if validation.observations.is_empty() {
                break 'pipeline progress.fail(format!(
                    "all {} fetched rows were rejected",
                    fetched
                ));
            }

            progress.advance(InstrumentState::Merging);
            match MergeEngine::merge(&mut self.store, instrument, &validation.observations) {
                Ok(stats) => {
                    progress.advance(InstrumentState::Done);
                    InstrumentOutcome::from_merge(fetched, skipped.len(), stats)
                }
                Err(e) => progress.fail(e.to_string()),
            }
        };

        InstrumentReport {
            instrument: instrument.clone(),
            state: progress.state,
            range,
            outcome,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        use InstrumentState::*;
        assert!(Pending.can_transition_to(Fetching));
        assert!(Fetching.can_transition_to(Validating));
        assert!(Merging.can_transition_to(Done));
        assert!(Validating.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Merging));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Fetching));

        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Merging.is_terminal());
    }

    #[test]
    fn test_outcome_from_merge() {
        let unchanged = MergeStats {
            inserted: 0,
            replaced: 0,
            unchanged: 3,
        };
        assert!(matches!(
            InstrumentOutcome::from_merge(3, 0, unchanged),
            InstrumentOutcome::NoNewData { unchanged: 3, .. }
        ));

        let revised = MergeStats {
            inserted: 1,
            replaced: 1,
            unchanged: 0,
        };
        let outcome = InstrumentOutcome::from_merge(2, 0, revised);
        assert!(outcome.is_updated());
        assert_eq!(outcome.changed(), 2);
    }

    #[test]
    fn test_empty_report_is_nothing_updated() {
        let report = SyncReport::default();
        assert_eq!(report.status(), RunStatus::NothingUpdated);
        assert_eq!(
            report.summary(),
            "Nothing updated: none of 0 instruments produced new data (0 failed)"
        );
    }
}
