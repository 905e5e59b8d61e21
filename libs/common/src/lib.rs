//! Shared infrastructure for the user services
//!
//! Connection pooling for PostgreSQL, the Redis client used for token
//! revocation lookups, and the error types both of them surface.

pub mod cache;
pub mod database;
pub mod error;
