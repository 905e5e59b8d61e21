//! Users service
//!
//! Two authenticated mutations on the caller's own user record: profile
//! fields and avatar image. Each request runs the same stages in order
//! (method, token, permission, identity, input validation, persistence)
//! and stops at the first failure.

pub mod auth;
pub mod avatar;
pub mod config;
pub mod error;
pub mod extractors;
pub mod jwt;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod sniff;
pub mod state;
pub mod upload;
pub mod validation;

#[cfg(test)]
mod testing;
