//! SQLite storage implementation for Pricevault.
//!
//! This crate provides the table backend of the time-series store using
//! Diesel ORM with SQLite. It contains:
//! - Database connection pooling and management
//! - Diesel migrations for the `observations` table
//! - The [`SqliteStore`] implementation of `TimeSeriesStore`
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//! The core crate is database-agnostic and works with the `TimeSeriesStore` trait.
//!
//! ```text
//!          core (sync engine)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod prices;
pub mod schema;

// Re-export database utilities
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use prices::SqliteStore;

// Re-export from pricevault-core for convenience
pub use pricevault_core::errors::{DatabaseError, Error, Result};
