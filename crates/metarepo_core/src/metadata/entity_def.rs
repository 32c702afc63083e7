//! Per-entity table metadata.

use super::{MetadataError, MetadataResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const DEFAULT_SCHEMA: &str = "main";
const DEFAULT_PK_COLUMN: &str = "id";
const DEFAULT_SORT: &str = "id desc";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));
static SORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_]*(\s+(?i:asc|desc))?(\s*,\s*[A-Za-z_][A-Za-z0-9_]*(\s+(?i:asc|desc))?)*$",
    )
    .expect("valid sort regex")
});

/// Static metadata for one entity type.
///
/// Deserialized from the module's ORM config with camelCase keys:
/// `name`, `schema`, `table`, `pkColumn`, `defaultSort`, `softDelete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    name: String,
    #[serde(default = "default_schema")]
    schema: String,
    table: String,
    #[serde(default = "default_pk_column")]
    pk_column: String,
    #[serde(default = "default_sort")]
    default_sort: String,
    #[serde(default)]
    soft_delete: bool,
}

impl EntityDef {
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        pk_column: impl Into<String>,
        default_sort: impl Into<String>,
        soft_delete: bool,
    ) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            table: table.into(),
            pk_column: pk_column.into(),
            default_sort: default_sort.into(),
            soft_delete,
        }
    }

    /// Definition with conventional defaults: `main` schema, lowercase table
    /// name, `id` primary key sorted descending, hard delete.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        let name = name.into();
        let table = name.to_lowercase();
        Self::new(
            name,
            DEFAULT_SCHEMA,
            table,
            DEFAULT_PK_COLUMN,
            DEFAULT_SORT,
            false,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `schema.table`, as used in every generated statement.
    pub fn full_table_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn pk_column(&self) -> &str {
        &self.pk_column
    }

    pub fn default_sort(&self) -> &str {
        &self.default_sort
    }

    pub fn is_soft_delete(&self) -> bool {
        self.soft_delete
    }

    /// Checks every identifier that is spliced into SQL text.
    pub fn validate(&self) -> MetadataResult<()> {
        self.check_identifier("schema", &self.schema)?;
        self.check_identifier("table", &self.table)?;
        self.check_identifier("primary key column", &self.pk_column)?;
        if !SORT_RE.is_match(self.default_sort.trim()) {
            return Err(self.invalid("default sort", &self.default_sort));
        }
        Ok(())
    }

    fn check_identifier(&self, kind: &'static str, value: &str) -> MetadataResult<()> {
        if is_identifier(value) {
            Ok(())
        } else {
            Err(self.invalid(kind, value))
        }
    }

    fn invalid(&self, kind: &'static str, value: &str) -> MetadataError {
        MetadataError::InvalidIdentifier {
            entity: self.name.clone(),
            kind,
            value: value.to_string(),
        }
    }
}

/// Returns whether `value` is a bare SQL identifier.
pub fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_pk_column() -> String {
    DEFAULT_PK_COLUMN.to_string()
}

fn default_sort() -> String {
    DEFAULT_SORT.to_string()
}
