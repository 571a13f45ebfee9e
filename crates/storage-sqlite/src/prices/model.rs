//! Database models for stored observations.

use diesel::prelude::*;

use pricevault_core::prices::{format_day, InstrumentId, PricePoint};

/// Database model for one `(instrument, date) -> price` row.
///
/// The date is kept as its `YYYY-MM-DD` text so that a row written by
/// another tool with a malformed date is reported instead of failing the
/// whole query.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::observations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ObservationDB {
    pub instrument: String,
    pub date: String,
    pub price: f64,
}

impl ObservationDB {
    pub fn new(instrument: &InstrumentId, point: &PricePoint) -> Self {
        Self {
            instrument: instrument.as_str().to_string(),
            date: format_day(point.date),
            price: point.price,
        }
    }
}
