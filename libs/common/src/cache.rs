//! Redis access for the user services
//!
//! The users service only reads from Redis: it checks whether a key is
//! present. Keys are written by the service that issues tokens.

use crate::error::{CacheError, CacheResult};
use redis::{AsyncCommands, Client};
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Self {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        RedisConfig { url }
    }
}

/// Redis client handle, cheap to clone
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Create the client. No connection is opened until the first command.
    pub fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)
    }

    /// Whether a key is present
    pub async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        conn.exists(key).await.map_err(CacheError::Command)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = RedisConfig {
            url: "not a redis url".to_string(),
        };

        assert!(matches!(
            RedisPool::new(&config),
            Err(CacheError::Connection(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_exists() -> CacheResult<()> {
        let pool = RedisPool::new(&RedisConfig::from_env())?;
        assert!(pool.health_check().await?);

        let key = "users_service_test_key";
        let mut conn = pool.get_connection().await?;
        let _: () = conn
            .set_ex(key, "1", 10)
            .await
            .map_err(CacheError::Command)?;
        assert!(pool.exists(key).await?);

        let _: u64 = conn.del(key).await.map_err(CacheError::Command)?;
        assert!(!pool.exists(key).await?);

        Ok(())
    }
}
