//! SQLite storage implementation for daily prices.

mod model;
mod store;

pub use model::ObservationDB;
pub use store::SqliteStore;
