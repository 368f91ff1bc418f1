//! Cache trait 定义

use async_trait::async_trait;
use storefront_errors::AppResult;
use std::time::Duration;

/// 缓存 trait
#[async_trait]
pub trait CachePort: Send + Sync {
    /// 获取缓存值
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// 设置缓存值
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()>;

    /// 删除缓存
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// 检查是否存在
    async fn exists(&self, key: &str) -> AppResult<bool>;
}

/// 基于标签的缓存失效
///
/// 写操作提交后按实体集合的标签（如 `roles`、`role:{id}`）通知缓存层，
/// 由缓存层决定具体淘汰哪些条目。
#[async_trait]
pub trait TagInvalidator: Send + Sync {
    /// 使带有任一标签的缓存条目失效
    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<()>;
}
