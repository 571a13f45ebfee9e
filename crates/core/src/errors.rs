//! Error taxonomy shared by every crate in the workspace. Storage crates
//! translate their backend errors into [`DatabaseError`] before returning.

use thiserror::Error;

use crate::prices::SourceFetchError;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type.
///
/// Only [`DatabaseError::WriteFailed`] is allowed to fail a whole sync run;
/// every other variant is contained at the per-instrument boundary of the
/// sync orchestrator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Market data fetch failed: {0}")]
    SourceFetch(#[from] SourceFetchError),

    #[error("Failed to load configuration: {0}")]
    ConfigIO(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),
}

impl Error {
    /// True when the store could not be persisted.
    pub fn is_storage_write(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::WriteFailed(_)))
    }
}

/// Store failures, carried as text so the core never names a backend type.
/// `ReadFailed` maps to a storage read error and `WriteFailed` to a storage
/// write error; the rest only arise from the SQLite backend.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("Cannot build connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// The backing medium could not be read or is corrupt.
    #[error("Failed to read store: {0}")]
    ReadFailed(String),

    /// The backing medium could not be written.
    #[error("Failed to persist store: {0}")]
    WriteFailed(String),
}

/// Errors raised while checking values entering or leaving the store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stored date '{value}' for {instrument} is not a calendar date")]
    CorruptStoredDate { instrument: String, value: String },

    #[error("Price {price} for {instrument} on {date} is not a finite number")]
    NonFinitePrice {
        instrument: String,
        date: String,
        price: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_storage_write() {
        let err: Error = DatabaseError::WriteFailed("disk full".to_string()).into();
        assert!(err.is_storage_write());

        let err: Error = DatabaseError::ReadFailed("corrupt".to_string()).into();
        assert!(!err.is_storage_write());
    }

    #[test]
    fn test_corrupt_date_message() {
        let err = ValidationError::CorruptStoredDate {
            instrument: "SPY".to_string(),
            value: "2024-13-45".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Stored date '2024-13-45' for SPY is not a calendar date"
        );
    }
}
