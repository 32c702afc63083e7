//! Precomputed statements for one entity type.
//!
//! # Invariants
//! - Statements are entity-type specific and reused for every row.
//! - Inserts and updates never assign `Id`, `Version`, `CreateTime` or
//!   `LastModifiedTime` from entity values.

use super::NOW_MILLIS_SQL;
use crate::metadata::column_mapper::FieldColumn;
use crate::metadata::shape::{
    is_non_insertable_field, is_non_updatable_field, Capabilities, DELETED_COLUMN,
    LAST_MODIFIED_TIME_FIELD, VERSION_FIELD,
};
use crate::metadata::{ColumnMapper, EntityDef};

/// The canonical statements plus the binding plans for named placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDef {
    select_columns: String,
    find_one: String,
    find_all: String,
    insert: String,
    update: String,
    delete: String,
    insert_binds: Vec<FieldColumn>,
    update_binds: Vec<FieldColumn>,
    pk_param: String,
    version_param: Option<String>,
    version_lookup: Option<String>,
}

impl QueryDef {
    /// Builds every statement for `def`.
    ///
    /// `capabilities` must be the flags `mapper` was validated against.
    pub fn build(def: &EntityDef, mapper: &ColumnMapper, capabilities: Capabilities) -> Self {
        let table = def.full_table_name();
        let select_columns = mapper.columns().join(", ");

        let insert_binds: Vec<FieldColumn> = mapper
            .pairs()
            .iter()
            .filter(|pair| !is_non_insertable_field(&pair.field))
            .cloned()
            .collect();
        let update_binds: Vec<FieldColumn> = mapper
            .pairs()
            .iter()
            .filter(|pair| !is_non_updatable_field(&pair.field))
            .cloned()
            .collect();

        let version_column = capabilities
            .versioned
            .then(|| mapper.column(VERSION_FIELD))
            .flatten();
        let modified_column = capabilities
            .timestamped
            .then(|| mapper.column(LAST_MODIFIED_TIME_FIELD))
            .flatten();
        let insert = insert_statement(&table, &insert_binds);
        let update = update_statement(
            &table,
            def.pk_column(),
            &update_binds,
            version_column,
            modified_column,
        );
        let delete = delete_statement(&table, def, modified_column);

        Self {
            find_one: format!(
                "select {select_columns} from {table} where {} = ?1",
                def.pk_column()
            ),
            find_all: format!(
                "select {select_columns} from {table} order by {}",
                def.default_sort()
            ),
            select_columns,
            insert,
            update,
            delete,
            insert_binds,
            update_binds,
            pk_param: format!(":{}", def.pk_column()),
            version_param: version_column.map(|column| format!(":{column}")),
            version_lookup: version_column.map(|column| {
                format!("select {column} from {table} where {} = ?1", def.pk_column())
            }),
        }
    }

    pub fn find_one(&self) -> &str {
        &self.find_one
    }

    pub fn find_all(&self) -> &str {
        &self.find_all
    }

    pub fn insert(&self) -> &str {
        &self.insert
    }

    pub fn update(&self) -> &str {
        &self.update
    }

    pub fn delete(&self) -> &str {
        &self.delete
    }

    /// Comma-separated column list used by every select.
    pub fn select_columns(&self) -> &str {
        &self.select_columns
    }

    /// Fields bound as `:column` by the insert statement.
    pub fn insert_binds(&self) -> &[FieldColumn] {
        &self.insert_binds
    }

    /// Fields bound as `:column` in the update SET clause.
    pub fn update_binds(&self) -> &[FieldColumn] {
        &self.update_binds
    }

    /// Named placeholder for the primary key in the update WHERE clause.
    pub fn pk_param(&self) -> &str {
        &self.pk_param
    }

    /// Named placeholder for the version predicate, when versioned.
    pub fn version_param(&self) -> Option<&str> {
        self.version_param.as_deref()
    }

    /// Reads back the stored version of one row, when versioned.
    pub fn version_lookup(&self) -> Option<&str> {
        self.version_lookup.as_deref()
    }
}

/// Reserved columns are left to their column defaults.
fn insert_statement(table: &str, binds: &[FieldColumn]) -> String {
    let columns: Vec<&str> = binds.iter().map(|pair| pair.column.as_str()).collect();
    let values: Vec<String> = binds
        .iter()
        .map(|pair| format!(":{}", pair.column))
        .collect();

    if columns.is_empty() {
        return format!("insert into {table} default values");
    }

    format!(
        "insert into {table}({}) values({})",
        columns.join(", "),
        values.join(", ")
    )
}

fn update_statement(
    table: &str,
    pk_column: &str,
    binds: &[FieldColumn],
    version_column: Option<&str>,
    modified_column: Option<&str>,
) -> String {
    let mut assignments: Vec<String> = binds
        .iter()
        .map(|pair| format!("{} = :{}", pair.column, pair.column))
        .collect();
    let mut predicate = format!("{pk_column} = :{pk_column}");

    if let Some(version) = version_column {
        assignments.push(format!("{version} = {version} + 1"));
        predicate.push_str(&format!(" and {version} = :{version}"));
    }
    if let Some(modified) = modified_column {
        assignments.push(format!("{modified} = {NOW_MILLIS_SQL}"));
    }
    if assignments.is_empty() {
        // Keeps the statement valid and still reports the row as matched.
        assignments.push(format!("{pk_column} = {pk_column}"));
    }

    format!(
        "update {table} set {} where {predicate}",
        assignments.join(", ")
    )
}

fn delete_statement(table: &str, def: &EntityDef, modified_column: Option<&str>) -> String {
    let pk = def.pk_column();
    if !def.is_soft_delete() {
        return format!("delete from {table} where {pk} = ?1");
    }

    match modified_column {
        Some(modified) => format!(
            "update {table} set {DELETED_COLUMN} = 1, {modified} = {NOW_MILLIS_SQL} where {pk} = ?1"
        ),
        None => format!("update {table} set {DELETED_COLUMN} = 1 where {pk} = ?1"),
    }
}
