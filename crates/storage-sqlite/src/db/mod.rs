//! Opening the database file, pooling connections, schema migrations.

use log::{debug, error, info};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use diesel::connection::{Connection, SimpleConnection};
use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::errors::IntoCore;
use pricevault_core::errors::{DatabaseError, Error, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Applied on every fresh connection; WAL mode itself is persistent and set
/// once in [`init`].
const SESSION_PRAGMAS: &str = "PRAGMA busy_timeout = 30000; PRAGMA synchronous = NORMAL;";

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Creates the parent directory, opens `db_path` and switches it to WAL.
///
/// A file that is not an SQLite database fails here, before any pool
/// exists.
pub fn init(db_path: &str) -> Result<()> {
    if let Some(dir) = Path::new(db_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty() && !p.exists())
    {
        fs::create_dir_all(dir).into_core()?;
    }

    let mut conn = SqliteConnection::establish(db_path).into_core()?;
    conn.batch_execute("PRAGMA journal_mode = WAL;")
        .into_core()?;
    conn.batch_execute(SESSION_PRAGMAS).into_core()?;
    debug!("Opened {} in WAL mode", db_path);
    Ok(())
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let pool = r2d2::Pool::builder()
        // A single sync run writes from one task; the second slot serves
        // reads issued while a write connection is checked out.
        .max_size(2)
        .connection_timeout(Duration::from_secs(30))
        .connection_customizer(Box::new(SessionPragmas))
        .build(ConnectionManager::<SqliteConnection>::new(db_path))
        .map_err(|e| DatabaseError::PoolCreationFailed(e.to_string()))?;
    Ok(Arc::new(pool))
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = get_connection(pool)?;
    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
        error!("Schema migration failed: {}", e);
        Error::Database(DatabaseError::MigrationFailed(e.to_string()))
    })?;

    for version in &applied {
        info!("Applied migration {}", version);
    }
    Ok(())
}

pub fn get_connection(pool: &Pool<ConnectionManager<SqliteConnection>>) -> Result<DbConnection> {
    pool.get().into_core()
}

/// Folds the write-ahead log back into the main database file. This is the
/// SQLite backend's persist step, so a failure is a write failure.
pub fn checkpoint(pool: &DbPool) -> Result<()> {
    let mut conn = get_connection(pool)?;
    conn.batch_execute("PRAGMA wal_checkpoint(TRUNCATE);")
        .map_err(|e| Error::Database(DatabaseError::WriteFailed(e.to_string())))
}

#[derive(Debug)]
struct SessionPragmas;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for SessionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), r2d2::Error> {
        conn.batch_execute(SESSION_PRAGMAS)
            .map_err(r2d2::Error::QueryError)
    }
}
