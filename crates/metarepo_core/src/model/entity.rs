//! `Entity` trait and column-resolving row access.

use crate::metadata::shape::ID_FIELD;
use crate::metadata::{ColumnMapper, EntityShape};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::{FromSql, Value};
use rusqlite::Row;

/// Stable primary key type. `0` marks a transient entity.
pub type EntityId = u64;

/// A record type the repository can persist.
///
/// Implementors declare their shape statically and expose values by field
/// name; the repository never inspects the struct layout.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Name the entity definition is registered under.
    const ENTITY_NAME: &'static str;
    const SHAPE: EntityShape;

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Optimistic-locking token; `None` for unversioned entities.
    fn version(&self) -> Option<u32> {
        None
    }

    fn set_version(&mut self, _version: u32) {}

    /// Value bound for `field` in generated inserts and updates.
    fn value_of(&self, field: &str) -> Option<Value>;

    /// Decodes one selected row.
    fn from_row(row: &MappedRow<'_, '_>) -> RepoResult<Self>;
}

/// A result row addressed by field name.
pub struct MappedRow<'a, 'stmt> {
    entity: &'a str,
    row: &'a Row<'stmt>,
    mapper: &'a ColumnMapper,
}

impl<'a, 'stmt> MappedRow<'a, 'stmt> {
    pub(crate) fn new(entity: &'a str, row: &'a Row<'stmt>, mapper: &'a ColumnMapper) -> Self {
        Self {
            entity,
            row,
            mapper,
        }
    }

    /// Reads the column mapped to `field`.
    pub fn get<T: FromSql>(&self, field: &str) -> RepoResult<T> {
        let column = self.mapper.column(field).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "field `{field}` is not mapped for entity `{}`",
                self.entity
            ))
        })?;
        Ok(self.row.get(column)?)
    }

    /// Reads the primary key field.
    pub fn id(&self) -> RepoResult<EntityId> {
        let raw: i64 = self.get(ID_FIELD)?;
        EntityId::try_from(raw).map_err(|_| {
            RepoError::InvalidData(format!(
                "negative id `{raw}` for entity `{}`",
                self.entity
            ))
        })
    }
}
