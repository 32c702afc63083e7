//! SQLite connection bootstrap and the shared database handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the persistence engine.
//! - Share one connection between repositories behind a lock.
//!
//! # Invariants
//! - Returned handles have `foreign_keys=ON` and a bounded busy timeout.
//! - The connection lock is held for exactly one repository operation.
//!
//! Schema creation is owned by the caller; this module never migrates.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A thread panicked while holding the connection lock.
    ConnectionPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::ConnectionPoisoned => {
                write!(f, "database connection lock poisoned by a panicked caller")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::ConnectionPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Cloneable handle to one SQLite connection.
///
/// Every clone refers to the same connection. Callers run work through
/// [`DbHandle::with_conn`], which serializes access.
#[derive(Clone)]
pub struct DbHandle {
    conn: Arc<Mutex<Connection>>,
}

impl DbHandle {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `work` with exclusive access to the connection.
    pub fn with_conn<T, E>(&self, work: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|_| E::from(DbError::ConnectionPoisoned))?;
        work(&guard)
    }

    /// Executes a batch of raw SQL, typically schema setup.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| conn.execute_batch(sql).map_err(DbError::from))
    }
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle").finish_non_exhaustive()
    }
}
