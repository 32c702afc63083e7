//! Generic SQLite repository driven by entity metadata.
//!
//! # Responsibility
//! - Provide finders and writers for any [`Entity`] without per-entity SQL.
//! - Verify table readiness once, at construction.
//!
//! # Invariants
//! - Single-row finders return `NotFound` on zero rows; multi-row finders
//!   return an empty `Vec`.
//! - `save` never reports a stale version as an error; `save_checked` does.
//! - A failed insert leaves no row behind and the entity id untouched.
//! - The progress handler installed for a call is removed before the
//!   connection lock is released.

use super::{RepoError, RepoResult, SaveOutcome};
use crate::catalog::{Catalog, EntityMeta};
use crate::context::CallContext;
use crate::db::DbHandle;
use crate::metadata::column_mapper::FieldColumn;
use crate::metadata::shape::{DELETED_COLUMN, VERSION_FIELD};
use crate::metadata::{ColumnMapper, EntityDef};
use crate::model::{Entity, EntityId, MappedRow};
use crate::monitoring::QueryMetrics;
use crate::query::criteria::{build_find_all_paged, build_find_one, build_query_by_attributes};
use crate::query::{Attributes, Page, QueryDef, UnknownAttributePolicy};
use log::{info, warn};
use rusqlite::types::{ToSql, Value};
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

pub const FIND_ONE_BY_ID: &str = "FindOneById";
pub const FIND_ALL: &str = "FindAll";
pub const FIND_ALL_PAGED: &str = "FindAllPaged";
pub const FIND_ONE_BY_ATTRIBUTE: &str = "FindOneByAttribute";
pub const FIND_ALL_BY_ATTRIBUTES: &str = "FindAllByAttributes";
pub const FIND_ALL_BY_ATTRIBUTES_PAGED: &str = "FindAllByAttributesPaged";
pub const CREATE: &str = "Create";
pub const UPDATE: &str = "Update";
pub const DELETE: &str = "Delete";

/// SQLite VM instructions between cancellation probes.
const PROGRESS_OPS: i32 = 1_000;

/// Repository for one entity type.
///
/// Cheap to share across threads; each call locks the shared connection for
/// its own duration only.
pub struct SqlRepository<E: Entity> {
    db: DbHandle,
    meta: Arc<EntityMeta>,
    metrics: Arc<QueryMetrics>,
    policy: UnknownAttributePolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> SqlRepository<E> {
    /// Builds a repository for the definition registered as `E::ENTITY_NAME`.
    ///
    /// # Errors
    /// - `Metadata` when the entity is unregistered or its shape is invalid.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when storage does
    ///   not match the mapping.
    pub fn try_new(
        db: &DbHandle,
        catalog: &Catalog,
        metrics: Arc<QueryMetrics>,
    ) -> RepoResult<Self> {
        let meta = catalog.meta(E::ENTITY_NAME, &E::SHAPE)?;
        Self::with_meta(db, meta, metrics)
    }

    /// Same as [`SqlRepository::try_new`] with an explicit definition.
    pub fn try_new_with_def(
        db: &DbHandle,
        catalog: &Catalog,
        def: Arc<EntityDef>,
        metrics: Arc<QueryMetrics>,
    ) -> RepoResult<Self> {
        let meta = catalog.meta_for(def, &E::SHAPE)?;
        Self::with_meta(db, meta, metrics)
    }

    fn with_meta(
        db: &DbHandle,
        meta: Arc<EntityMeta>,
        metrics: Arc<QueryMetrics>,
    ) -> RepoResult<Self> {
        db.with_conn(|conn| ensure_table_ready(conn, &meta))?;
        Ok(Self {
            db: db.clone(),
            meta,
            metrics,
            policy: UnknownAttributePolicy::default(),
            _entity: PhantomData,
        })
    }

    /// Chooses how attribute finders treat unmapped attribute names.
    pub fn with_unknown_attribute_policy(mut self, policy: UnknownAttributePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn entity_def(&self) -> &EntityDef {
        self.meta.def()
    }

    pub fn column_mapper(&self) -> &ColumnMapper {
        self.meta.mapper()
    }

    pub fn query_def(&self) -> &QueryDef {
        self.meta.query_def()
    }

    pub fn find_one_by_id(&self, ctx: &CallContext, id: EntityId) -> RepoResult<E> {
        let params = vec![id_value(id)?];
        self.run(ctx, FIND_ONE_BY_ID, |conn| {
            self.query_one(conn, self.query_def().find_one(), params)
        })
    }

    pub fn find_all(&self, ctx: &CallContext) -> RepoResult<Vec<E>> {
        self.run(ctx, FIND_ALL, |conn| {
            self.query_all(conn, self.query_def().find_all(), Vec::new())
        })
    }

    pub fn find_all_paged(&self, ctx: &CallContext, limit: u32, offset: u64) -> RepoResult<Vec<E>> {
        let query = build_find_all_paged(self.query_def(), Page::new(limit, offset));
        self.run(ctx, FIND_ALL_PAGED, |conn| {
            self.query_all(conn, &query.sql, query.params)
        })
    }

    /// Looks up one row by a unique attribute.
    pub fn find_one_by_attribute(
        &self,
        ctx: &CallContext,
        attr: &str,
        value: impl Into<Value>,
    ) -> RepoResult<E> {
        let sql = build_find_one(
            self.entity_def(),
            self.query_def(),
            self.column_mapper(),
            attr,
        )?;
        let params = vec![value.into()];
        self.run(ctx, FIND_ONE_BY_ATTRIBUTE, |conn| {
            self.query_one(conn, &sql, params)
        })
    }

    /// Rows matching every attribute, in default sort order.
    pub fn find_all_by_attributes(
        &self,
        ctx: &CallContext,
        attrs: &Attributes,
    ) -> RepoResult<Vec<E>> {
        let query = build_query_by_attributes(
            self.entity_def(),
            self.query_def(),
            self.column_mapper(),
            attrs,
            None,
            self.policy,
        )?;
        self.run(ctx, FIND_ALL_BY_ATTRIBUTES, |conn| {
            self.query_all(conn, &query.sql, query.params)
        })
    }

    pub fn find_all_by_attributes_paged(
        &self,
        ctx: &CallContext,
        attrs: &Attributes,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<E>> {
        let query = build_query_by_attributes(
            self.entity_def(),
            self.query_def(),
            self.column_mapper(),
            attrs,
            Some(Page::new(limit, offset)),
            self.policy,
        )?;
        self.run(ctx, FIND_ALL_BY_ATTRIBUTES_PAGED, |conn| {
            self.query_all(conn, &query.sql, query.params)
        })
    }

    /// Inserts a transient entity (id `0`) or updates a persisted one.
    ///
    /// On insert the generated id (and stored version, when versioned) is
    /// written back into `entity`. On a versioned update that applied, the
    /// in-memory version is bumped to match storage.
    pub fn save(&self, ctx: &CallContext, entity: &mut E) -> RepoResult<SaveOutcome> {
        if entity.id() == 0 {
            self.insert(ctx, entity)
        } else {
            self.update(ctx, entity)
        }
    }

    /// Like [`SqlRepository::save`], but an update that matched no row fails
    /// with `Conflict` (versioned) or `NotFound` (unversioned).
    pub fn save_checked(&self, ctx: &CallContext, entity: &mut E) -> RepoResult<SaveOutcome> {
        match self.save(ctx, entity)? {
            SaveOutcome::NotApplied if self.meta.capabilities().versioned => {
                Err(RepoError::Conflict {
                    entity: self.entity_name().to_string(),
                    id: entity.id(),
                })
            }
            SaveOutcome::NotApplied => Err(self.not_found()),
            outcome => Ok(outcome),
        }
    }

    /// Deletes by id; soft-delete entities only flip their `deleted` flag.
    ///
    /// Deleting an id that does not exist is not an error.
    pub fn delete(&self, ctx: &CallContext, id: EntityId) -> RepoResult<()> {
        let params = vec![id_value(id)?];
        self.run(ctx, DELETE, |conn| {
            let mut stmt = conn.prepare_cached(self.query_def().delete())?;
            stmt.execute(params_from_iter(params))?;
            Ok(())
        })
    }

    /// Insert and version read-back commit together; any failure rolls the
    /// row back so the entity keeps id 0.
    fn insert(&self, ctx: &CallContext, entity: &mut E) -> RepoResult<SaveOutcome> {
        let qd = self.query_def();
        let params = self.bind_named(entity, qd.insert_binds())?;

        let (id, version) = self.run(ctx, CREATE, |conn| {
            let tx = conn.unchecked_transaction()?;
            tx.prepare_cached(qd.insert())?
                .execute(named_params(&params).as_slice())?;
            let raw_id = tx.last_insert_rowid();
            let id = EntityId::try_from(raw_id).map_err(|_| {
                RepoError::InvalidData(format!(
                    "negative rowid `{raw_id}` for entity `{}`",
                    self.entity_name()
                ))
            })?;

            let version = match qd.version_lookup() {
                Some(sql) => {
                    let raw: Option<i64> = tx.query_row(sql, [raw_id], |row| row.get(0))?;
                    Some(self.stored_version(id, raw)?)
                }
                None => None,
            };
            tx.commit()?;
            Ok((id, version))
        })?;

        entity.set_id(id);
        if let Some(version) = version {
            entity.set_version(version);
        }
        Ok(SaveOutcome::Created { id })
    }

    fn stored_version(&self, id: EntityId, raw: Option<i64>) -> RepoResult<u32> {
        let raw = raw.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "entity `{}` id={id} stored without a version; the version column needs a default",
                self.entity_name()
            ))
        })?;
        u32::try_from(raw).map_err(|_| {
            RepoError::InvalidData(format!(
                "entity `{}` id={id} has out-of-range version `{raw}`",
                self.entity_name()
            ))
        })
    }

    fn update(&self, ctx: &CallContext, entity: &mut E) -> RepoResult<SaveOutcome> {
        let qd = self.query_def();
        let mut params = self.bind_named(entity, qd.update_binds())?;
        params.push((qd.pk_param().to_string(), id_value(entity.id())?));

        let next_version = match qd.version_param() {
            Some(param) => {
                let version = entity.version().ok_or_else(|| self.missing(VERSION_FIELD))?;
                let next = version.checked_add(1).ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "entity `{}` id={} version `{version}` cannot be incremented",
                        self.entity_name(),
                        entity.id()
                    ))
                })?;
                params.push((param.to_string(), Value::Integer(i64::from(version))));
                Some(next)
            }
            None => None,
        };

        let changed = self.run(ctx, UPDATE, |conn| {
            let mut stmt = conn.prepare_cached(qd.update())?;
            Ok(stmt.execute(named_params(&params).as_slice())?)
        })?;

        if changed == 0 {
            return Ok(SaveOutcome::NotApplied);
        }
        if let Some(next) = next_version {
            entity.set_version(next);
        }
        Ok(SaveOutcome::Updated)
    }

    /// Runs one repository call: context check, interrupt wiring, metrics and
    /// the per-execution log line when a monitoring context is attached.
    ///
    /// Calls rejected by the context check are still recorded.
    fn run<T>(
        &self,
        ctx: &CallContext,
        query: &'static str,
        work: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let started = Instant::now();
        let result = ctx.check().and_then(|()| {
            self.db.with_conn(|conn| {
                conn.progress_handler(PROGRESS_OPS, Some(ctx.interrupt_probe()));
                let _guard = ProgressHandlerGuard { conn };
                work(conn)
            })
        });
        let elapsed = started.elapsed();
        self.metrics.record(self.entity_name(), query, elapsed);

        if let Some(monitoring) = ctx.monitoring() {
            let duration_ms = elapsed.as_millis();
            match &result {
                Ok(_) => info!(
                    "event=query_executed module=repo status=ok type={} query={query} duration_ms={duration_ms} cid={} reqid={}",
                    self.entity_name(),
                    monitoring.cid,
                    monitoring.reqid
                ),
                Err(err) => warn!(
                    "event=query_executed module=repo status=error type={} query={query} duration_ms={duration_ms} cid={} reqid={} error={err}",
                    self.entity_name(),
                    monitoring.cid,
                    monitoring.reqid
                ),
            }
        }

        result
    }

    fn query_all(&self, conn: &Connection, sql: &str, params: Vec<Value>) -> RepoResult<Vec<E>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut entities = Vec::new();

        while let Some(row) = rows.next()? {
            let mapped = MappedRow::new(self.entity_name(), row, self.column_mapper());
            entities.push(E::from_row(&mapped)?);
        }

        Ok(entities)
    }

    fn query_one(&self, conn: &Connection, sql: &str, params: Vec<Value>) -> RepoResult<E> {
        let mut stmt = conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;

        match rows.next()? {
            Some(row) => {
                let mapped = MappedRow::new(self.entity_name(), row, self.column_mapper());
                E::from_row(&mapped)
            }
            None => Err(self.not_found()),
        }
    }

    fn bind_named(&self, entity: &E, binds: &[FieldColumn]) -> RepoResult<Vec<(String, Value)>> {
        binds
            .iter()
            .map(|pair| {
                let value = entity
                    .value_of(&pair.field)
                    .ok_or_else(|| self.missing(&pair.field))?;
                Ok((format!(":{}", pair.column), value))
            })
            .collect()
    }

    fn entity_name(&self) -> &str {
        self.entity_def().name()
    }

    fn not_found(&self) -> RepoError {
        RepoError::NotFound {
            entity: self.entity_name().to_string(),
        }
    }

    fn missing(&self, field: &str) -> RepoError {
        RepoError::MissingFieldValue {
            entity: self.entity_name().to_string(),
            field: field.to_string(),
        }
    }
}

struct ProgressHandlerGuard<'conn> {
    conn: &'conn Connection,
}

impl Drop for ProgressHandlerGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

fn named_params(params: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

fn id_value(id: EntityId) -> RepoResult<Value> {
    i64::try_from(id)
        .map(Value::Integer)
        .map_err(|_| RepoError::InvalidData(format!("id `{id}` exceeds the SQLite integer range")))
}

fn ensure_table_ready(conn: &Connection, meta: &EntityMeta) -> RepoResult<()> {
    let def = meta.def();
    if !table_exists(conn, def.schema(), def.table())? {
        return Err(RepoError::MissingRequiredTable(def.full_table_name()));
    }

    let mut required = meta.mapper().columns();
    if def.is_soft_delete() {
        required.push(DELETED_COLUMN);
    }

    for column in required {
        if !table_has_column(conn, def.schema(), def.table(), column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: def.full_table_name(),
                column: column.to_string(),
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, schema: &str, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        &format!(
            "SELECT EXISTS(
                SELECT 1
                FROM {schema}.sqlite_master
                WHERE type = 'table' AND name = ?1
            );"
        ),
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, schema: &str, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA {schema}.table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
