//! Use-case services composed from a repository and a cache.
//!
//! # Responsibility
//! - Route id lookups through the read-through cache.
//! - Invalidate cached entries after successful writes.

pub mod crud_service;

pub use crud_service::CrudService;
