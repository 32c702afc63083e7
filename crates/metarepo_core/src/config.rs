//! ORM configuration document.
//!
//! The caller reads the document from wherever it lives; this module only
//! parses JSON text and applies it.
//!
//! ```json
//! {
//!   "entities": [{ "name": "Project", "table": "project", "defaultSort": "name asc" }],
//!   "caches": [{ "name": "projects", "maxElements": 1000, "ttlSeconds": 60 }],
//!   "cacheBackend": "sharded"
//! }
//! ```

use crate::cache::{CacheConfig, CacheProvider, CacheRegistry};
use crate::catalog::Catalog;
use crate::logging::LoggingConfig;
use crate::metadata::{EntityDef, MetadataError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Metadata(MetadataError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid ORM config: {err}"),
            Self::Metadata(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Metadata(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<MetadataError> for ConfigError {
    fn from(value: MetadataError) -> Self {
        Self::Metadata(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrmConfig {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub caches: Vec<CacheConfig>,
    #[serde(default)]
    pub cache_backend: CacheProvider,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl OrmConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Registers every entity definition; stops at the first invalid one.
    pub fn register_entities(&self, catalog: &Catalog) -> Result<(), ConfigError> {
        for def in &self.entities {
            catalog.register_entity_def(def.clone())?;
        }
        Ok(())
    }

    /// Registry holding every named cache config, using the configured backend.
    pub fn cache_registry(&self) -> CacheRegistry {
        let registry = CacheRegistry::new(self.cache_backend);
        for config in &self.caches {
            registry.register(config.clone());
        }
        registry
    }
}
