//! Field-name to column-name mapping derived from a declared shape.
//!
//! # Invariants
//! - The mapping never changes after build.
//! - `pairs()`, `fields()` and `columns()` share one order (by field name), so
//!   index `i` of each always describes the same field.

use super::shape::{
    EntityShape, FieldDecl, CREATE_TIME_FIELD, LAST_MODIFIED_TIME_FIELD, VERSION_FIELD,
};
use super::{entity_def::is_identifier, MetadataError, MetadataResult};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// One mapped field and its column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldColumn {
    pub field: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapper {
    by_field: HashMap<String, String>,
    pairs: Vec<FieldColumn>,
}

impl ColumnMapper {
    /// Walks `shape` depth-first and builds the mapping for `entity_name`.
    ///
    /// # Errors
    /// - `EmptyShape` when no field is mapped.
    /// - `InvalidIdentifier` when a column name is not a bare identifier.
    /// - `MissingCapabilityField` when a declared capability lacks its field.
    pub fn build(entity_name: &str, shape: &EntityShape) -> MetadataResult<Self> {
        let mut fields = BTreeMap::new();
        collect_fields(entity_name, shape.fields, &mut fields);

        if fields.is_empty() {
            return Err(MetadataError::EmptyShape {
                entity: entity_name.to_string(),
            });
        }

        for column in fields.values() {
            if !is_identifier(column) {
                return Err(MetadataError::InvalidIdentifier {
                    entity: entity_name.to_string(),
                    kind: "column",
                    value: column.clone(),
                });
            }
        }

        let pairs: Vec<FieldColumn> = fields
            .into_iter()
            .map(|(field, column)| FieldColumn { field, column })
            .collect();
        let by_field = pairs
            .iter()
            .map(|pair| (pair.field.clone(), pair.column.clone()))
            .collect();
        let mapper = Self { by_field, pairs };

        let caps = shape.capabilities;
        if caps.versioned {
            mapper.require(entity_name, "versioned", VERSION_FIELD)?;
        }
        if caps.timestamped {
            mapper.require(entity_name, "timestamped", CREATE_TIME_FIELD)?;
            mapper.require(entity_name, "timestamped", LAST_MODIFIED_TIME_FIELD)?;
        }

        Ok(mapper)
    }

    pub fn has_column(&self, field: &str) -> bool {
        self.by_field.contains_key(field)
    }

    /// Column mapped to `field`, if any.
    pub fn column(&self, field: &str) -> Option<&str> {
        self.by_field.get(field).map(String::as_str)
    }

    pub fn pairs(&self) -> &[FieldColumn] {
        &self.pairs
    }

    pub fn fields(&self) -> Vec<&str> {
        self.pairs.iter().map(|pair| pair.field.as_str()).collect()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.pairs.iter().map(|pair| pair.column.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn require(
        &self,
        entity_name: &str,
        capability: &'static str,
        field: &'static str,
    ) -> MetadataResult<()> {
        if self.has_column(field) {
            Ok(())
        } else {
            Err(MetadataError::MissingCapabilityField {
                entity: entity_name.to_string(),
                capability,
                field,
            })
        }
    }
}

fn collect_fields(entity_name: &str, decls: &[FieldDecl], out: &mut BTreeMap<String, String>) {
    for decl in decls {
        match *decl {
            FieldDecl::Column { field, tag } | FieldDecl::Nested { field, tag } => {
                let column = tag.unwrap_or(field);
                if let Some(previous) = out.insert(field.to_string(), column.to_string()) {
                    debug!(
                        "event=column_map module=metadata status=override entity={entity_name} field={field} previous={previous} column={column}"
                    );
                }
            }
            FieldDecl::Embedded(group) => collect_fields(entity_name, group, out),
            FieldDecl::Indirect(Some(group)) => collect_fields(entity_name, group, out),
            FieldDecl::Indirect(None) => {
                debug!(
                    "event=column_map module=metadata status=skipped entity={entity_name} reason=absent_indirect_group"
                );
            }
        }
    }
}
