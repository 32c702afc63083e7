//! Attribute-map criteria and paged query construction.
//!
//! # Invariants
//! - Attributes are visited in sorted key order; placeholder `?n` binds
//!   `params[n - 1]`.
//! - Attribute names are resolved through the column mapper, never spliced raw.

use crate::metadata::{ColumnMapper, EntityDef};
use crate::query::QueryDef;
use log::debug;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Attribute filters keyed by field name.
pub type Attributes = BTreeMap<String, Value>;

/// Limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }
}

/// What to do with attribute names the mapper does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownAttributePolicy {
    #[default]
    Reject,
    /// Drop unknown names and keep filtering on the rest.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    UnknownAttribute(String),
}

impl Display for CriteriaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttribute(name) => write!(f, "unknown attribute: {name}"),
        }
    }
}

impl Error for CriteriaError {}

/// SQL text plus positional parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Builds the `col = ?n and ...` fragment for `attrs`.
///
/// Returns an empty fragment for an empty map.
pub fn build_criteria(
    mapper: &ColumnMapper,
    attrs: &Attributes,
    policy: UnknownAttributePolicy,
) -> Result<(String, Vec<Value>), CriteriaError> {
    let mut criteria = Vec::with_capacity(attrs.len());
    let mut params = Vec::with_capacity(attrs.len());

    for (name, value) in attrs {
        let Some(column) = mapper.column(name) else {
            match policy {
                UnknownAttributePolicy::Reject => {
                    return Err(CriteriaError::UnknownAttribute(name.clone()))
                }
                UnknownAttributePolicy::Ignore => {
                    debug!("event=criteria_build module=query status=skipped attribute={name}");
                    continue;
                }
            }
        };
        params.push(value.clone());
        criteria.push(format!("{column} = ?{}", params.len()));
    }

    Ok((criteria.join(" and "), params))
}

/// Builds a select over `attrs`, ordered by the default sort and optionally paged.
pub fn build_query_by_attributes(
    def: &EntityDef,
    qd: &QueryDef,
    mapper: &ColumnMapper,
    attrs: &Attributes,
    page: Option<Page>,
    policy: UnknownAttributePolicy,
) -> Result<CriteriaQuery, CriteriaError> {
    let (criteria, mut params) = build_criteria(mapper, attrs, policy)?;

    let mut sql = format!(
        "select {} from {}",
        qd.select_columns(),
        def.full_table_name()
    );
    if !criteria.is_empty() {
        sql.push_str(" where ");
        sql.push_str(&criteria);
    }
    sql.push_str(" order by ");
    sql.push_str(def.default_sort());

    if let Some(page) = page {
        let next = params.len() + 1;
        sql.push_str(&format!(" limit ?{next} offset ?{}", next + 1));
        params.extend(page_params(page));
    }

    Ok(CriteriaQuery { sql, params })
}

/// Single-row select keyed on one (unique) attribute, bound as `?1`.
pub fn build_find_one(
    def: &EntityDef,
    qd: &QueryDef,
    mapper: &ColumnMapper,
    attr: &str,
) -> Result<String, CriteriaError> {
    let column = mapper
        .column(attr)
        .ok_or_else(|| CriteriaError::UnknownAttribute(attr.to_string()))?;
    Ok(format!(
        "select {} from {} where {column} = ?1",
        qd.select_columns(),
        def.full_table_name()
    ))
}

/// Default find-all statement with a bound limit/offset window.
pub fn build_find_all_paged(qd: &QueryDef, page: Page) -> CriteriaQuery {
    CriteriaQuery {
        sql: format!("{} limit ?1 offset ?2", qd.find_all()),
        params: page_params(page).to_vec(),
    }
}

fn page_params(page: Page) -> [Value; 2] {
    [
        Value::Integer(i64::from(page.limit)),
        Value::Integer(i64::try_from(page.offset).unwrap_or(i64::MAX)),
    ]
}
