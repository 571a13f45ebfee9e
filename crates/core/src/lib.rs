//! Pricevault Core - Domain entities, services, and traits.
//!
//! This crate contains the incremental synchronization engine: it decides
//! which date range is still missing per tracked instrument, cleans what the
//! market data source returns, and merges the result into a time-series
//! store with last-write-wins upsert semantics.
//!
//! It is storage-agnostic and defines the [`prices::TimeSeriesStore`] trait
//! that is implemented by the `storage-json` and `storage-sqlite` crates.

pub mod config;
pub mod errors;
pub mod instruments;
pub mod prices;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

pub use config::SyncSettings;
pub use instruments::TrackedInstruments;
