//! 进程内缓存 (Moka)
//!
//! 每个条目可以带独立的 TTL，未指定时使用默认 TTL。

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::time::{Duration, Instant};
use storefront_config::CacheConfig;
use storefront_errors::AppResult;
use storefront_ports::CachePort;

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

struct EntryExpiry {
    default_ttl: Duration,
}

impl EntryExpiry {
    fn ttl_of(&self, entry: &Entry) -> Option<Duration> {
        Some(entry.ttl.unwrap_or(self.default_ttl))
    }
}

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        self.ttl_of(value)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.ttl_of(value)
    }
}

/// 基于 Moka 的本地缓存
#[derive(Clone)]
pub struct MokaCache {
    inner: Cache<String, Entry>,
}

impl MokaCache {
    pub fn new(max_capacity: u64, default_ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry { default_ttl })
            .build();
        Self { inner }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_capacity, Duration::from_secs(config.default_ttl_secs))
    }
}

#[async_trait]
impl CachePort for MokaCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> AppResult<()> {
        self.inner
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.inner.contains_key(key))
    }
}
