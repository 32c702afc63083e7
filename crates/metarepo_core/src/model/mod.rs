//! Entity contract consumed by the generic repository.
//!
//! # Responsibility
//! - Describe how a plain record type exposes its identity, bind values and
//!   row decoding to the persistence engine.
//!
//! # Invariants
//! - An entity with id `0` has never been persisted.
//! - Field names used by an entity match the names declared in its shape.

pub mod entity;

pub use entity::{Entity, EntityId, MappedRow};
