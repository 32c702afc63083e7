//! Statically declared entity shapes and reusable field groups.
//!
//! An entity declares its fields as a tree of [`FieldDecl`] nodes. Common
//! building blocks (identity, version token, timestamps) are shared groups that
//! concrete entities embed, e.g.:
//!
//! ```
//! use metarepo_core::metadata::shape::{Capabilities, EntityShape, FieldDecl, VERSIONED};
//!
//! const PROJECT_SHAPE: EntityShape = EntityShape::new(
//!     &[
//!         FieldDecl::Embedded(VERSIONED),
//!         FieldDecl::tagged("Name", "name"),
//!         FieldDecl::untagged("Description"),
//!     ],
//!     Capabilities::VERSIONED,
//! );
//! ```

/// Field holding the primary key value.
pub const ID_FIELD: &str = "Id";
/// Field holding the optimistic-locking token.
pub const VERSION_FIELD: &str = "Version";
pub const CREATE_TIME_FIELD: &str = "CreateTime";
pub const LAST_MODIFIED_TIME_FIELD: &str = "LastModifiedTime";
/// Column flipped by soft deletes.
pub const DELETED_COLUMN: &str = "deleted";

const RESERVED_FIELDS: [&str; 4] = [
    ID_FIELD,
    VERSION_FIELD,
    CREATE_TIME_FIELD,
    LAST_MODIFIED_TIME_FIELD,
];

/// One node of a declared entity shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDecl {
    /// Terminal field; `tag` overrides the column name.
    Column {
        field: &'static str,
        tag: Option<&'static str>,
    },
    /// Named composite value stored in a single column; never flattened.
    Nested {
        field: &'static str,
        tag: Option<&'static str>,
    },
    /// Anonymous group whose fields merge into the parent mapping.
    Embedded(&'static [FieldDecl]),
    /// Group behind an optional indirection; `None` contributes no fields.
    Indirect(Option<&'static [FieldDecl]>),
}

impl FieldDecl {
    pub const fn tagged(field: &'static str, column: &'static str) -> Self {
        Self::Column {
            field,
            tag: Some(column),
        }
    }

    pub const fn untagged(field: &'static str) -> Self {
        Self::Column { field, tag: None }
    }
}

/// Optional behaviors that change generated statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Updates compare and bump a version token.
    pub versioned: bool,
    /// Create/modify times are maintained by the engine.
    pub timestamped: bool,
}

impl Capabilities {
    pub const NONE: Self = Self {
        versioned: false,
        timestamped: false,
    };
    pub const VERSIONED: Self = Self {
        versioned: true,
        timestamped: false,
    };
    pub const TIMESTAMPED: Self = Self {
        versioned: false,
        timestamped: true,
    };
    pub const VERSIONED_TIMESTAMPED: Self = Self {
        versioned: true,
        timestamped: true,
    };
}

/// Complete declared shape of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityShape {
    pub fields: &'static [FieldDecl],
    pub capabilities: Capabilities,
}

impl EntityShape {
    pub const fn new(fields: &'static [FieldDecl], capabilities: Capabilities) -> Self {
        Self {
            fields,
            capabilities,
        }
    }
}

pub const IDENTITY: &[FieldDecl] = &[FieldDecl::tagged(ID_FIELD, "id")];
pub const VERSION: &[FieldDecl] = &[FieldDecl::tagged(VERSION_FIELD, "version")];
pub const TIMESTAMPS: &[FieldDecl] = &[
    FieldDecl::tagged(CREATE_TIME_FIELD, "create_time"),
    FieldDecl::tagged(LAST_MODIFIED_TIME_FIELD, "last_modified_time"),
];

pub const VERSIONED: &[FieldDecl] = &[FieldDecl::Embedded(IDENTITY), FieldDecl::Embedded(VERSION)];
pub const TIMESTAMPED: &[FieldDecl] =
    &[FieldDecl::Embedded(IDENTITY), FieldDecl::Embedded(TIMESTAMPS)];
pub const VERSIONED_TIMESTAMPED: &[FieldDecl] = &[
    FieldDecl::Embedded(IDENTITY),
    FieldDecl::Embedded(VERSION),
    FieldDecl::Embedded(TIMESTAMPS),
];

/// Fields never written by generated inserts.
pub fn is_non_insertable_field(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}

/// Fields never assigned by generated updates.
pub fn is_non_updatable_field(field: &str) -> bool {
    RESERVED_FIELDS.contains(&field)
}
