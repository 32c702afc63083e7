//! Static entity metadata: table definitions, declared shapes and column mapping.
//!
//! # Responsibility
//! - Describe where an entity lives (`EntityDef`) and what it looks like
//!   (`EntityShape`), without runtime introspection.
//! - Derive the field/column correspondence used by every generated statement.
//!
//! # Invariants
//! - Metadata is immutable once built and shared read-only.
//! - Identifiers interpolated into SQL are validated at registration time.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod column_mapper;
pub mod entity_def;
pub mod shape;

pub use column_mapper::ColumnMapper;
pub use entity_def::EntityDef;
pub use shape::{Capabilities, EntityShape, FieldDecl};

pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised while registering or deriving entity metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Shape walk produced no mapped field.
    EmptyShape { entity: String },
    /// A declared capability has no backing field in the shape.
    MissingCapabilityField {
        entity: String,
        capability: &'static str,
        field: &'static str,
    },
    /// Schema, table, column or sort text is not a plain SQL identifier list.
    InvalidIdentifier {
        entity: String,
        kind: &'static str,
        value: String,
    },
    UnknownEntity(String),
    /// A different definition is already registered under the same name.
    DuplicateEntity(String),
}

impl Display for MetadataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyShape { entity } => write!(f, "entity `{entity}` declares no fields"),
            Self::MissingCapabilityField {
                entity,
                capability,
                field,
            } => write!(
                f,
                "entity `{entity}` declares capability `{capability}` but maps no `{field}` field"
            ),
            Self::InvalidIdentifier {
                entity,
                kind,
                value,
            } => write!(f, "entity `{entity}` has invalid {kind} `{value}`"),
            Self::UnknownEntity(name) => write!(f, "entity not registered: {name}"),
            Self::DuplicateEntity(name) => {
                write!(f, "entity already registered with a different definition: {name}")
            }
        }
    }
}

impl Error for MetadataError {}
