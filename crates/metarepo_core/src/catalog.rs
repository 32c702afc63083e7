//! Process-wide entity catalog owned by the application's composition root.
//!
//! # Responsibility
//! - Hold registered `EntityDef`s by entity name.
//! - Build column mapper + query definitions exactly once per entity name.
//!
//! # Invariants
//! - Metadata for a name never changes after it is first built.
//! - Concurrent first builds for the same name run the builder once; builds for
//!   different names do not wait on each other.

use crate::metadata::{
    Capabilities, ColumnMapper, EntityDef, EntityShape, MetadataError, MetadataResult,
};
use crate::query::QueryDef;
use log::info;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Everything a repository needs for one entity type.
#[derive(Debug)]
pub struct EntityMeta {
    def: Arc<EntityDef>,
    capabilities: Capabilities,
    mapper: Arc<ColumnMapper>,
    query_def: Arc<QueryDef>,
}

impl EntityMeta {
    pub fn def(&self) -> &Arc<EntityDef> {
        &self.def
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn mapper(&self) -> &Arc<ColumnMapper> {
        &self.mapper
    }

    pub fn query_def(&self) -> &Arc<QueryDef> {
        &self.query_def
    }
}

type MetaCell = Arc<OnceCell<Arc<EntityMeta>>>;

/// Registry of entity definitions and their derived metadata.
#[derive(Debug, Default)]
pub struct Catalog {
    defs: RwLock<BTreeMap<String, Arc<EntityDef>>>,
    metas: Mutex<BTreeMap<String, MetaCell>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one entity definition.
    ///
    /// Re-registering an identical definition is a no-op that returns the
    /// existing instance.
    ///
    /// # Errors
    /// - `InvalidIdentifier` when the definition fails validation.
    /// - `DuplicateEntity` when a different definition owns the name.
    pub fn register_entity_def(&self, def: EntityDef) -> MetadataResult<Arc<EntityDef>> {
        def.validate()?;

        let mut defs = self.defs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = defs.get(def.name()) {
            if **existing == def {
                return Ok(Arc::clone(existing));
            }
            return Err(MetadataError::DuplicateEntity(def.name().to_string()));
        }

        info!(
            "event=entity_register module=catalog status=ok entity={} table={}",
            def.name(),
            def.full_table_name()
        );
        let def = Arc::new(def);
        defs.insert(def.name().to_string(), Arc::clone(&def));
        Ok(def)
    }

    /// Returns a registered definition by entity name.
    pub fn entity_def(&self, name: &str) -> Option<Arc<EntityDef>> {
        self.defs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Sorted registered entity names.
    pub fn entity_names(&self) -> Vec<String> {
        self.defs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Returns the metadata for the registered entity `name`, building it on
    /// first use from `shape`.
    pub fn meta(&self, name: &str, shape: &EntityShape) -> MetadataResult<Arc<EntityMeta>> {
        let def = self
            .entity_def(name)
            .ok_or_else(|| MetadataError::UnknownEntity(name.to_string()))?;
        self.meta_for(def, shape)
    }

    /// Returns the metadata for `def`, building it on first use from `shape`.
    ///
    /// Once built, later calls return the same instance regardless of the
    /// arguments.
    pub fn meta_for(
        &self,
        def: Arc<EntityDef>,
        shape: &EntityShape,
    ) -> MetadataResult<Arc<EntityMeta>> {
        let cell = self.meta_cell(def.name());
        let meta = cell.get_or_try_init(|| build_meta(def, shape))?;
        Ok(Arc::clone(meta))
    }

    /// Column mapper already built for `name`, if any.
    pub fn column_mapper(&self, name: &str) -> Option<Arc<ColumnMapper>> {
        self.built_meta(name).map(|meta| Arc::clone(&meta.mapper))
    }

    /// Query definition already built for `name`, if any.
    pub fn query_def(&self, name: &str) -> Option<Arc<QueryDef>> {
        self.built_meta(name).map(|meta| Arc::clone(&meta.query_def))
    }

    fn built_meta(&self, name: &str) -> Option<Arc<EntityMeta>> {
        let metas = self.metas.lock().unwrap_or_else(PoisonError::into_inner);
        metas.get(name).and_then(|cell| cell.get().cloned())
    }

    fn meta_cell(&self, name: &str) -> MetaCell {
        let mut metas = self.metas.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(metas.entry(name.to_string()).or_default())
    }
}

fn build_meta(def: Arc<EntityDef>, shape: &EntityShape) -> MetadataResult<Arc<EntityMeta>> {
    def.validate()?;
    let mapper = ColumnMapper::build(def.name(), shape)?;
    let query_def = QueryDef::build(&def, &mapper, shape.capabilities);
    info!(
        "event=entity_meta_build module=catalog status=ok entity={} columns={} versioned={} timestamped={} soft_delete={}",
        def.name(),
        mapper.len(),
        shape.capabilities.versioned,
        shape.capabilities.timestamped,
        def.is_soft_delete()
    );

    Ok(Arc::new(EntityMeta {
        def,
        capabilities: shape.capabilities,
        mapper: Arc::new(mapper),
        query_def: Arc::new(query_def),
    }))
}
