//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned handles have `foreign_keys=ON`.
//! - Every open attempt emits one `db_open` start event and one ok/error event.

use super::{DbHandle, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a SQLite database file.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<DbHandle> {
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory SQLite database.
pub fn open_db_in_memory() -> DbResult<DbHandle> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<DbHandle> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = opener().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        );
        err
    })?;

    if let Err(err) = configure_connection(&conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err.into());
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(DbHandle::new(conn))
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
