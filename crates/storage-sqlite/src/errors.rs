//! Diesel, r2d2 and filesystem failures, folded into the core error type at
//! the crate boundary.

use diesel::result::Error as DieselError;
use pricevault_core::errors::{DatabaseError, Error};
use thiserror::Error;

/// Errors raised inside this crate. Callers only ever see the core
/// [`Error`] they convert into.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not open database: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Could not acquire connection: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Could not prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let db = match err {
            StorageError::ConnectionFailed(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::PoolError(e) => DatabaseError::PoolCreationFailed(e.to_string()),
            StorageError::QueryFailed(e) => DatabaseError::QueryFailed(e.to_string()),
        };
        Error::Database(db)
    }
}

/// `.into_core()` on any result whose error this crate knows how to map.
pub trait IntoCore<T> {
    fn into_core(self) -> pricevault_core::Result<T>;
}

impl<T, E> IntoCore<T> for std::result::Result<T, E>
where
    E: Into<StorageError>,
{
    fn into_core(self) -> pricevault_core::Result<T> {
        self.map_err(|e| Error::from(e.into()))
    }
}
