//! Storefront Access - 访问控制服务入口
//!
//! 负责资源、权限、角色与用户角色的管理和统一鉴权

use std::time::Duration;

use secrecy::ExposeSecret;
use storefront_access::build_actions;
use storefront_access::infrastructure::persistence::DbMetrics;
use storefront_adapter_postgres::{PostgresConfig, check_connection, create_pool};
use storefront_config::AppConfig;
use storefront_errors::AppError;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load("config")?;
    storefront_telemetry::init_for_env(&config.app_env, &config.telemetry.log_level);
    let _metrics = storefront_telemetry::init_metrics()?;

    info!(app = %config.app_name, env = %config.app_env, "Initializing access service...");

    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections)
        .with_min_connections(config.database.min_connections)
        .with_connect_timeout(Duration::from_secs(
            config.database.connect_timeout_secs,
        ));
    let pool = create_pool(&pg_config).await?;
    check_connection(&pool).await?;

    if config.access.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::internal(format!("Migration failed: {}", e)))?;
        info!("Database migrations applied");
    }

    let actions = build_actions(pool.clone(), &config.cache);
    let metrics_pool = pool.clone();
    let pool_reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(15));
        loop {
            ticker.tick().await;
            DbMetrics::record_pool_state(&metrics_pool, "primary");
        }
    });
    info!("Access service ready");

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }

    pool_reporter.abort();
    drop(actions);
    pool.close().await;
    info!("Access service stopped");
    Ok(())
}
