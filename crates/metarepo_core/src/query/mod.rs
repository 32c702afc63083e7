//! SQL generation for metadata-driven repositories.
//!
//! # Responsibility
//! - Precompute the five canonical statements per entity type (`QueryDef`).
//! - Build parameterized WHERE clauses from attribute maps at call time.
//!
//! # Invariants
//! - Only validated identifiers are spliced into SQL text; values are always bound.
//! - Placeholder numbering follows sorted attribute names.

pub mod criteria;
pub mod query_def;

pub use criteria::{Attributes, CriteriaError, CriteriaQuery, Page, UnknownAttributePolicy};
pub use query_def::QueryDef;

/// Current time as epoch milliseconds, evaluated by SQLite.
pub const NOW_MILLIS_SQL: &str = "(strftime('%s', 'now') * 1000)";
