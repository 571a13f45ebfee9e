//! Pricevault Market Data Crate
//!
//! This crate defines the contract for the external daily-price source and
//! ships a Yahoo Finance implementation of it.
//!
//! # Overview
//!
//! A provider answers one question: "give me the daily prices for this
//! symbol between these two calendar days". Everything it returns is
//! untrusted: rows come back as [`RawPriceRow`] values whose date may not
//! parse and whose price may be missing or non-finite. Cleaning those rows
//! is the job of the core crate's validator, not of the provider.
//!
//! ```text
//! +------------------+     +------------------+     +------------------+
//! |   Sync (core)    | --> | MarketDataProvider| --> |   RawPriceRow    |
//! +------------------+     +------------------+     +------------------+
//!                                   |
//!                                   v
//!                           YahooProvider, ...
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataProvider`] - The source contract
//! - [`RawPriceRow`] / [`RawDate`] - Unvalidated rows as the source produced them
//! - [`PriceField`] - Which price column a provider should emit
//! - [`MarketDataError`] / [`RetryClass`] - Failure taxonomy and retry policy

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{MarketDataError, RetryClass};
pub use models::{PriceField, RawDate, RawPriceRow};
pub use provider::yahoo::YahooProvider;
pub use provider::{MarketDataProvider, RateLimit};
