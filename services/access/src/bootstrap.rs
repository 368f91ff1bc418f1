//! 服务装配

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use storefront_adapter_postgres::TransactionManager;
use storefront_config::CacheConfig;

use crate::api::AccessActions;
use crate::infrastructure::cache::{MokaCache, TaggedCache};
use crate::infrastructure::persistence::{PostgresRbacQueryRepository, PostgresUnitOfWorkFactory};

/// 基于连接池和缓存配置装配全部操作
pub fn build_actions(pool: PgPool, cache_config: &CacheConfig) -> AccessActions {
    let uow_factory = Arc::new(PostgresUnitOfWorkFactory::new(TransactionManager::new(
        pool.clone(),
    )));
    let query_repo = Arc::new(PostgresRbacQueryRepository::new(pool));
    let cache = Arc::new(TaggedCache::new(Arc::new(MokaCache::from_config(cache_config))));

    AccessActions::new(
        uow_factory,
        query_repo,
        cache,
        Duration::from_secs(cache_config.default_ttl_secs),
    )
}
