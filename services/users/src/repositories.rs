//! Persistence for user mutations

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProfileChanges;

/// Failures reported by a [`UserStore`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("User {0} not found")]
    NotFound(Uuid),
}

/// Backend that owns user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Apply only the supplied profile fields
    async fn update_profile(&self, user_id: Uuid, changes: &ProfileChanges)
    -> Result<(), StoreError>;

    /// Point the user's avatar at a file that passed inspection
    async fn update_avatar(&self, user_id: Uuid, path: &Path) -> Result<(), StoreError>;
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Build the `UPDATE users` statement for a change set. Columns whose
/// change is `None` are not mentioned at all.
fn profile_update_query(user_id: Uuid, changes: &ProfileChanges) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new("UPDATE users SET updated_at = NOW()");

    if let Some(name) = &changes.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(gender) = &changes.gender {
        query.push(", gender = ").push_bind(gender.as_deref());
    }
    if let Some(birthdate) = &changes.birthdate {
        query.push(", birthdate = ").push_bind(*birthdate);
    }

    query.push(" WHERE id = ").push_bind(user_id);
    query
}

#[async_trait]
impl UserStore for UserRepository {
    async fn update_profile(
        &self,
        user_id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<(), StoreError> {
        let result = profile_update_query(user_id, changes)
            .build()
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(user_id));
        }

        Ok(())
    }

    async fn update_avatar(&self, user_id: Uuid, path: &Path) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET avatar = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(path.to_string_lossy().into_owned())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(user_id));
        }

        Ok(())
    }
}
