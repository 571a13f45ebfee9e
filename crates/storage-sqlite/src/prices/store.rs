use chrono::{NaiveDate, Utc};
use diesel::dsl::{count_star, max, min};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use diesel::upsert::excluded;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::model::ObservationDB;
use crate::db::{checkpoint, create_pool, get_connection, init, run_migrations, DbPool};
use crate::errors::IntoCore;
use crate::schema::observations;
use pricevault_core::errors::{DatabaseError, Error, Result, ValidationError};
use pricevault_core::prices::{
    ensure_finite, parse_day, InstrumentId, InstrumentSummary, PricePoint, TimeSeriesStore,
};

/// Time-series store backed by an SQLite table with a composite primary key
/// on `(instrument, date)`.
///
/// Every upsert commits its own transaction, so rows are durable as soon as
/// they are written; `persist` only checkpoints the write-ahead log.
pub struct SqliteStore {
    pool: Arc<DbPool>,
    db_path: String,
    load_warning: Option<String>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `db_path` and applies migrations.
    ///
    /// When an existing file is not an SQLite database, or its image is
    /// malformed, it is moved aside to `<name>.corrupt-<timestamp>` and a
    /// fresh database is created in its place, with the reason available
    /// from `load_warning`. Any other failure (a locked database, a failed
    /// migration) is returned and the file is left untouched.
    pub fn open(db_path: &str) -> Result<Self> {
        let mut load_warning = None;

        if let Err(e) = init(db_path) {
            if !(Path::new(db_path).exists() && is_unreadable_database(&e)) {
                return Err(e);
            }
            let moved = quarantine(db_path).map_err(|io| {
                DatabaseError::ReadFailed(format!(
                    "{}: {}; could not be moved aside: {}",
                    db_path, e, io
                ))
            })?;
            let warning = format!("{}: {}; moved to {}", db_path, e, moved.display());
            warn!("Starting with an empty database: {}", warning);
            init(db_path)?;
            load_warning = Some(warning);
        }

        let pool = create_pool(db_path)?;
        run_migrations(&pool)?;
        Ok(Self {
            pool,
            db_path: db_path.to_string(),
            load_warning,
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

/// True for the SQLite errors that mean the file itself is unusable
/// (`SQLITE_NOTADB`, `SQLITE_CORRUPT`), as opposed to busy or I/O failures.
fn is_unreadable_database(err: &Error) -> bool {
    match err {
        Error::Database(DatabaseError::ConnectionFailed(msg))
        | Error::Database(DatabaseError::QueryFailed(msg)) => {
            msg.contains("not a database") || msg.contains("malformed")
        }
        _ => false,
    }
}

/// Moves a database and its WAL/SHM companions out of the way.
fn quarantine(db_path: &str) -> std::io::Result<PathBuf> {
    let suffix = format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S"));
    let target = PathBuf::from(format!("{}{}", db_path, suffix));
    fs::rename(db_path, &target)?;

    for companion in ["-wal", "-shm"] {
        let path = format!("{}{}", db_path, companion);
        if Path::new(&path).exists() {
            fs::rename(&path, format!("{}{}{}", db_path, suffix, companion))?;
        }
    }
    Ok(target)
}

/// Inserts or overwrites one row and returns the price it replaced.
fn upsert_row(conn: &mut SqliteConnection, row: &ObservationDB) -> QueryResult<Option<f64>> {
    let previous = observations::table
        .filter(observations::instrument.eq(&row.instrument))
        .filter(observations::date.eq(&row.date))
        .select(observations::price)
        .first::<f64>(conn)
        .optional()?;

    diesel::insert_into(observations::table)
        .values(row)
        .on_conflict((observations::instrument, observations::date))
        .do_update()
        .set(observations::price.eq(excluded(observations::price)))
        .execute(conn)?;

    Ok(previous)
}

fn parse_stored_day(instrument: &str, value: &str) -> Result<NaiveDate> {
    parse_day(value).ok_or_else(|| {
        ValidationError::CorruptStoredDate {
            instrument: instrument.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

impl TimeSeriesStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn get_existing(&self, instrument: &InstrumentId) -> Result<Vec<PricePoint>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = observations::table
            .filter(observations::instrument.eq(instrument.as_str()))
            .order(observations::date.asc())
            .select(ObservationDB::as_select())
            .load::<ObservationDB>(&mut conn)
            .into_core()?;

        let mut points = rows
            .iter()
            .map(|row| {
                parse_stored_day(&row.instrument, &row.date)
                    .map(|date| PricePoint::new(date, row.price))
            })
            .collect::<Result<Vec<_>>>()?;
        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    fn upsert(
        &mut self,
        instrument: &InstrumentId,
        date: NaiveDate,
        price: f64,
    ) -> Result<Option<f64>> {
        ensure_finite(instrument, date, price)?;
        let row = ObservationDB::new(instrument, &PricePoint::new(date, price));

        let mut conn = get_connection(&self.pool)?;
        conn.immediate_transaction::<_, DieselError, _>(|conn| upsert_row(conn, &row))
            .into_core()
    }

    /// Applies the whole batch in one transaction: either every point is
    /// written or none is.
    fn upsert_many(
        &mut self,
        instrument: &InstrumentId,
        points: &[PricePoint],
    ) -> Result<Vec<Option<f64>>> {
        for point in points {
            ensure_finite(instrument, point.date, point.price)?;
        }
        let rows: Vec<ObservationDB> = points
            .iter()
            .map(|p| ObservationDB::new(instrument, p))
            .collect();

        let mut conn = get_connection(&self.pool)?;
        let previous = conn
            .immediate_transaction::<_, DieselError, _>(|conn| {
                rows.iter().map(|row| upsert_row(conn, row)).collect()
            })
            .into_core()?;

        debug!("Upserted {} rows for {}", rows.len(), instrument);
        Ok(previous)
    }

    fn persist(&mut self) -> Result<()> {
        checkpoint(&self.pool)?;
        debug!("Checkpointed {}", self.db_path);
        Ok(())
    }

    fn instruments(&self) -> Result<Vec<InstrumentId>> {
        let mut conn = get_connection(&self.pool)?;
        let ids = observations::table
            .select(observations::instrument)
            .distinct()
            .order(observations::instrument.asc())
            .load::<String>(&mut conn)
            .into_core()?;
        Ok(ids.into_iter().map(InstrumentId::new).collect())
    }

    fn summarize(&self) -> Result<Vec<InstrumentSummary>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = observations::table
            .group_by(observations::instrument)
            .select((
                observations::instrument,
                count_star(),
                min(observations::date),
                max(observations::date),
            ))
            .load::<(String, i64, Option<String>, Option<String>)>(&mut conn)
            .into_core()?;

        let mut summaries = rows
            .into_iter()
            .map(|(instrument, rows, first, last)| {
                let first = first
                    .map(|d| parse_stored_day(&instrument, &d))
                    .transpose()?;
                let last = last
                    .map(|d| parse_stored_day(&instrument, &d))
                    .transpose()?;
                Ok(InstrumentSummary {
                    instrument: InstrumentId::new(instrument),
                    rows: rows as usize,
                    first,
                    last,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        summaries.sort_by(|a, b| a.instrument.cmp(&b.instrument));
        Ok(summaries)
    }

    fn load_warning(&self) -> Option<&str> {
        self.load_warning.as_deref()
    }
}
