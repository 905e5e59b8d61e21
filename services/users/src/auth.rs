//! Caller authorization
//!
//! The token is decoded once. The permission stage and the identity stage
//! both read that single result, but each keeps its own failure status: a
//! token that cannot be decoded is a 403 from the permission stage, a token
//! that is permitted but names no usable user is a 401.

use async_trait::async_trait;
use common::{cache::RedisPool, error::CacheError};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{error::ApiError, policy::PermissionQuery, state::AppState};

/// Revocation list for tokens that are still within their lifetime
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn is_revoked(&self, token: &str) -> Result<bool, CacheError>;
}

/// Redis-backed denylist, sharing key names with the issuing service
#[derive(Clone)]
pub struct RedisDenylist {
    pool: RedisPool,
}

impl RedisDenylist {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key(token: &str) -> String {
        format!("blacklisted_token:{}", token)
    }
}

#[async_trait]
impl TokenDenylist for RedisDenylist {
    async fn is_revoked(&self, token: &str) -> Result<bool, CacheError> {
        self.pool.exists(&Self::key(token)).await
    }
}

/// Run the permission and identity stages for a bare token, yielding the
/// caller's user id
pub async fn authorize(
    state: &AppState,
    token: &str,
    query: &PermissionQuery,
) -> Result<Uuid, ApiError> {
    let decoded = state.jwt_service.decode(token);

    // Permission: any failure, including an undecodable token, is a denial
    let claims = match decoded {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Permission check failed, token rejected: {}", e);
            return Err(ApiError::Forbidden);
        }
    };

    match state.policy.evaluate(&claims, query).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                "Permission {} denied for subject {}",
                query.key(),
                claims.sub
            );
            return Err(ApiError::Forbidden);
        }
        Err(e) => {
            error!("Permission {} could not be evaluated: {}", query.key(), e);
            return Err(ApiError::Forbidden);
        }
    }

    // Identity
    let user_id = claims.user_id().map_err(|e| {
        warn!("Failed to resolve caller identity: {}", e);
        ApiError::Unauthorized
    })?;

    let revoked = state.denylist.is_revoked(token).await.map_err(|e| {
        error!("Failed to check if token is blacklisted: {}", e);
        ApiError::Internal("Internal server error".to_string())
    })?;

    if revoked {
        warn!("Revoked token presented for user {}", user_id);
        return Err(ApiError::Unauthorized);
    }

    Ok(user_id)
}
