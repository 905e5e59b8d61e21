//! Scoped permission decisions
//!
//! A handler never builds a [`PermissionQuery`] from request input. Each
//! endpoint names a [`Capability`] type and the query is that type's
//! constant, so a caller cannot widen the scope being checked.

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use std::collections::HashMap;
use thiserror::Error;

use crate::jwt::{Claims, TokenError};

/// The capability being exercised: `resource:action:scope`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionQuery {
    pub resource: &'static str,
    pub action: &'static str,
    pub scope: &'static str,
}

impl PermissionQuery {
    /// Key used in role permission maps and token permission claims
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.resource, self.action, self.scope)
    }
}

/// Type-level name for a fixed permission query
pub trait Capability: Send + Sync + 'static {
    const QUERY: PermissionQuery;
}

/// Update the caller's own user record
pub struct UpdateOwnUser;

impl Capability for UpdateOwnUser {
    const QUERY: PermissionQuery = PermissionQuery {
        resource: "users",
        action: "update",
        scope: "own",
    };
}

/// Why a decision could not be reached
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Policy lookup failed: {0}")]
    Lookup(#[from] sqlx::Error),
}

/// Answers "may this caller do this?"
///
/// Callers must treat `Err` exactly like `Ok(false)`.
#[async_trait]
pub trait PolicyEngine: Send + Sync {
    async fn evaluate(&self, claims: &Claims, query: &PermissionQuery)
    -> Result<bool, PolicyError>;
}

/// Grants from the `permissions` claim carried by the token itself
#[derive(Debug, Clone, Default)]
pub struct ClaimsPolicyEngine;

#[async_trait]
impl PolicyEngine for ClaimsPolicyEngine {
    async fn evaluate(
        &self,
        claims: &Claims,
        query: &PermissionQuery,
    ) -> Result<bool, PolicyError> {
        let key = query.key();
        Ok(claims.permissions.iter().any(|p| *p == key))
    }
}

/// Grants from the roles assigned to the subject in PostgreSQL
#[derive(Clone)]
pub struct RolePolicyEngine {
    pool: PgPool,
}

impl RolePolicyEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyEngine for RolePolicyEngine {
    async fn evaluate(
        &self,
        claims: &Claims,
        query: &PermissionQuery,
    ) -> Result<bool, PolicyError> {
        let user_id = claims.user_id()?;

        let role_permissions: Vec<Json<HashMap<String, bool>>> = sqlx::query_scalar(
            r#"
            SELECT r.permissions
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(roles_grant(
            role_permissions.iter().map(|Json(permissions)| permissions),
            query,
        ))
    }
}

/// True when at least one role maps the query key to `true`
pub fn roles_grant<'a>(
    roles: impl IntoIterator<Item = &'a HashMap<String, bool>>,
    query: &PermissionQuery,
) -> bool {
    let key = query.key();
    roles
        .into_iter()
        .any(|permissions| permissions.get(&key).copied().unwrap_or(false))
}

/// Which engine to build at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    Roles,
    Claims,
}

impl std::str::FromStr for PolicySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "roles" => Ok(PolicySource::Roles),
            "claims" => Ok(PolicySource::Claims),
            other => Err(format!("Unknown policy source: {}", other)),
        }
    }
}
