//! Metadata-driven repository over SQLite.
//!
//! # Responsibility
//! - Execute the precomputed statements of one entity type.
//! - Map driver results onto semantic errors (`NotFound`, `Conflict`).
//!
//! # Invariants
//! - This is the only layer that talks to the database driver.
//! - Values are always bound; only validated identifiers reach SQL text.
//! - Every call is recorded in `QueryMetrics`.

use crate::db::DbError;
use crate::metadata::MetadataError;
use crate::model::EntityId;
use crate::query::CriteriaError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sql_repository;

pub use sql_repository::SqlRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for metadata-driven persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// A single-row lookup or a checked write matched nothing.
    NotFound { entity: String },
    Db(DbError),
    /// A versioned write lost the optimistic-locking race.
    Conflict { entity: String, id: EntityId },
    UnknownAttribute(String),
    /// A mapped field the entity could not supply a bind value for.
    MissingFieldValue { entity: String, field: String },
    Metadata(MetadataError),
    Cancelled,
    DeadlineExceeded,
    MissingRequiredTable(String),
    MissingRequiredColumn { table: String, column: String },
    InvalidData(String),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity } => write!(f, "{entity} not found"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict { entity, id } => {
                write!(f, "{entity} {id} was modified concurrently")
            }
            Self::UnknownAttribute(name) => write!(f, "unknown attribute: {name}"),
            Self::MissingFieldValue { entity, field } => {
                write!(f, "{entity} provides no value for mapped field `{field}`")
            }
            Self::Metadata(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::DeadlineExceeded => write!(f, "operation deadline exceeded"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column: {table}.{column}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Metadata(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<MetadataError> for RepoError {
    fn from(value: MetadataError) -> Self {
        Self::Metadata(value)
    }
}

impl From<CriteriaError> for RepoError {
    fn from(value: CriteriaError) -> Self {
        match value {
            CriteriaError::UnknownAttribute(name) => Self::UnknownAttribute(name),
        }
    }
}

/// Result of [`SqlRepository::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Inserted; the entity now carries `id`.
    Created { id: EntityId },
    Updated,
    /// The update matched no row: missing id or stale version.
    NotApplied,
}
