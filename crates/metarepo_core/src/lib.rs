//! Metadata-driven persistence engine over SQLite with read-through caching.
//!
//! Entities declare a static shape; the engine derives column mappings and
//! SQL once per entity type and serves generic finders and writers.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod monitoring;
pub mod query;
pub mod repo;
pub mod service;

pub use cache::{id_to_key, Cache, CacheConfig, CacheProvider, CacheRegistry, ConfiguredCache};
pub use catalog::{Catalog, EntityMeta};
pub use config::{ConfigError, OrmConfig};
pub use context::CallContext;
pub use db::{open_db, open_db_in_memory, DbError, DbHandle, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use metadata::{
    Capabilities, ColumnMapper, EntityDef, EntityShape, FieldDecl, MetadataError, MetadataResult,
};
pub use model::{Entity, EntityId, MappedRow};
pub use monitoring::{MonitoringContext, QueryMetrics};
pub use query::{Attributes, Page, QueryDef, UnknownAttributePolicy};
pub use repo::{RepoError, RepoResult, SaveOutcome, SqlRepository};
pub use service::CrudService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
