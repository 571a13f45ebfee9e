//! Daily price synchronization module.
//!
//! This module provides the core types and traits for keeping a store of
//! daily prices up to date:
//!
//! - [`model`] - Instrument identifiers, observations and summaries
//! - [`store`] - The [`TimeSeriesStore`] storage trait
//! - [`watermark`] - High-water mark resolution per instrument
//! - [`planner`] - Fetch range planning
//! - [`validator`] - Raw row validation with per-row skip reasons
//! - [`merge`] - Last-write-wins merge into a store
//! - [`client`] - Market data client facade for the market-data crate
//! - [`sync`] - The per-instrument sync orchestrator
//! - [`constants`] - Configuration constants
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator → MarketDataClient → market-data crate (providers)
//!       ↓
//! FetchPlanner → WatermarkResolver
//!       ↓
//! ObservationValidator → MergeEngine → TimeSeriesStore (json | sqlite)
//! ```

pub mod client;
pub mod constants;
pub mod errors;
pub mod merge;
pub mod model;
pub mod planner;
pub mod store;
pub mod sync;
pub mod validator;
pub mod watermark;

#[cfg(test)]
pub(crate) mod testing;


pub use client::MarketDataClient;
pub use errors::SourceFetchError;
pub use merge::{MergeEngine, MergeStats};
pub use model::{
    ensure_finite, format_day, parse_day, InstrumentId, InstrumentSummary, Observation,
    PricePoint,
};
pub use planner::{FetchPlan, FetchPlanner};
pub use store::TimeSeriesStore;
pub use sync::{
    InstrumentOutcome, InstrumentReport, InstrumentState, RunStatus, SyncOrchestrator,
    SyncReport, SyncRunError,
};
pub use validator::{
    normalize_date, ObservationValidator, SkipReason, SkippedRow, ValidationReport,
    ValidatorConfig,
};
pub use watermark::{Watermark, WatermarkResolver};
