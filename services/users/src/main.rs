use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use users::{
    auth::RedisDenylist,
    config::{ServiceConfig, ValidationRules},
    jwt::{JwtConfig, JwtService},
    policy::{ClaimsPolicyEngine, PolicyEngine, PolicySource, RolePolicyEngine},
    repositories::UserRepository,
    routes,
    sniff::MagicSniffer,
    state::AppState,
    upload::UploadStaging,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting users service");

    let config = ServiceConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let redis_pool = RedisPool::new(&RedisConfig::from_env())?;
    if !redis_pool.health_check().await? {
        anyhow::bail!("Failed to connect to Redis");
    }

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;

    let policy: Arc<dyn PolicyEngine> = match config.policy_source {
        PolicySource::Roles => Arc::new(RolePolicyEngine::new(pool.clone())),
        PolicySource::Claims => Arc::new(ClaimsPolicyEngine),
    };
    info!("Permission decisions from {:?}", config.policy_source);

    let app_state = AppState {
        jwt_service,
        policy,
        denylist: Arc::new(RedisDenylist::new(redis_pool)),
        user_store: Arc::new(UserRepository::new(pool)),
        sniffer: Arc::new(MagicSniffer),
        staging: UploadStaging::new(&config.avatar_upload_dir),
        rules: Arc::new(ValidationRules::default()),
    };

    info!(
        "Avatar uploads staged in {}",
        config.avatar_upload_dir.display()
    );

    let app = routes::create_router(app_state, config.avatar_max_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Users service listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Users service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
