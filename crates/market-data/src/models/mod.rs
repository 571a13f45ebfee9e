//! Market data models
//!
//! Raw daily price rows (`RawPriceRow`, `RawDate`) exchanged with providers,
//! and the price column selection (`PriceField`).

mod price;

pub use price::{PriceField, RawDate, RawPriceRow};
