//! Generic CRUD service for one entity type.
//!
//! # Invariants
//! - Only id lookups are cached, keyed by [`id_to_key`].
//! - A write that fails leaves the cache untouched.

use crate::cache::{id_to_key, Cache};
use crate::context::CallContext;
use crate::model::{Entity, EntityId};
use crate::query::Attributes;
use crate::repo::{RepoResult, SqlRepository};
use std::marker::PhantomData;
use std::sync::Arc;

pub struct CrudService<E: Entity, C: Cache<E>> {
    repo: SqlRepository<E>,
    cache: C,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, C: Cache<E>> CrudService<E, C> {
    pub fn new(repo: SqlRepository<E>, cache: C) -> Self {
        Self {
            repo,
            cache,
            _entity: PhantomData,
        }
    }

    pub fn repository(&self) -> &SqlRepository<E> {
        &self.repo
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Cached lookup; a miss loads from the repository and fills the cache.
    pub fn get_by_id(&self, ctx: &CallContext, id: EntityId) -> RepoResult<Arc<E>> {
        self.cache
            .get_or_compute(&id_to_key(id), || self.repo.find_one_by_id(ctx, id))
    }

    pub fn get_all(&self, ctx: &CallContext) -> RepoResult<Vec<E>> {
        self.repo.find_all(ctx)
    }

    pub fn get_all_paged(&self, ctx: &CallContext, limit: u32, offset: u64) -> RepoResult<Vec<E>> {
        self.repo.find_all_paged(ctx, limit, offset)
    }

    pub fn find_one(&self, ctx: &CallContext, attrs: &Attributes) -> RepoResult<Option<E>> {
        Ok(self
            .repo
            .find_all_by_attributes_paged(ctx, attrs, 1, 0)?
            .into_iter()
            .next())
    }

    pub fn find_all(&self, ctx: &CallContext, attrs: &Attributes) -> RepoResult<Vec<E>> {
        self.repo.find_all_by_attributes(ctx, attrs)
    }

    pub fn find_all_paged(
        &self,
        ctx: &CallContext,
        attrs: &Attributes,
        limit: u32,
        offset: u64,
    ) -> RepoResult<Vec<E>> {
        self.repo
            .find_all_by_attributes_paged(ctx, attrs, limit, offset)
    }

    /// Persists `entity` as a new row and returns its id.
    ///
    /// Any id already set on `entity` is discarded.
    pub fn create(&self, ctx: &CallContext, entity: &mut E) -> RepoResult<EntityId> {
        entity.set_id(0);
        self.repo.save(ctx, entity)?;
        Ok(entity.id())
    }

    /// Loads `id`, applies `change`, and writes it back.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Conflict` when a versioned row changed between load and write.
    pub fn update(
        &self,
        ctx: &CallContext,
        id: EntityId,
        change: impl FnOnce(&mut E),
    ) -> RepoResult<E> {
        let mut entity = self.repo.find_one_by_id(ctx, id)?;
        change(&mut entity);
        entity.set_id(id);

        self.repo.save_checked(ctx, &mut entity)?;
        self.cache.invalidate(&id_to_key(id));
        Ok(entity)
    }

    pub fn delete(&self, ctx: &CallContext, id: EntityId) -> RepoResult<()> {
        self.repo.delete(ctx, id)?;
        self.cache.invalidate(&id_to_key(id));
        Ok(())
    }
}
