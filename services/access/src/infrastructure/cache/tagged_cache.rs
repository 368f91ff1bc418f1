//! 带标签的读穿缓存
//!
//! 查询结果以 JSON 存入 [`CachePort`]，同时记录 标签 → 键 的索引。
//! 写操作提交后按标签失效；缓存故障时退化为直接读库。

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_errors::AppResult;
use storefront_ports::{CachePort, TagInvalidator};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 标签索引，双向记录以便按键清理
#[derive(Default)]
struct TagIndex {
    by_tag: HashMap<String, HashSet<String>>,
    by_key: HashMap<String, KeyEntry>,
}

#[derive(Default)]
struct KeyEntry {
    tags: HashSet<String>,
    /// 正在写入该键的任务数
    writers: usize,
}

impl TagIndex {
    fn register(&mut self, key: &str, tags: &[String]) {
        for tag in tags {
            self.by_tag.entry(tag.clone()).or_default().insert(key.to_string());
        }
        let entry = self.by_key.entry(key.to_string()).or_default();
        entry.tags.extend(tags.iter().cloned());
        entry.writers += 1;
    }

    fn settle(&mut self, key: &str) {
        if let Some(entry) = self.by_key.get_mut(key) {
            entry.writers = entry.writers.saturating_sub(1);
        }
    }

    /// 缓存未命中时清理；有写入在途的键保留
    fn forget_idle(&mut self, key: &str) {
        if self.by_key.get(key).is_some_and(|e| e.writers == 0) {
            self.forget(key);
        }
    }

    fn forget(&mut self, key: &str) {
        let Some(entry) = self.by_key.remove(key) else {
            return;
        };
        for tag in entry.tags {
            if let Some(keys) = self.by_tag.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.by_tag.remove(&tag);
                }
            }
        }
    }

    fn take(&mut self, tags: &[String]) -> HashSet<String> {
        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| self.by_tag.remove(tag))
            .flatten()
            .collect();
        for key in &keys {
            self.forget(key);
        }
        keys
    }
}

pub struct TaggedCache {
    store: Arc<dyn CachePort>,
    index: Mutex<TagIndex>,
    /// 每次失效递增；加载期间发生过失效的结果不保留
    epoch: AtomicU64,
}

impl TaggedCache {
    pub fn new(store: Arc<dyn CachePort>) -> Self {
        Self {
            store,
            index: Mutex::new(TagIndex::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// 索引中登记的键数量
    pub async fn indexed_keys(&self) -> usize {
        self.index.lock().await.by_key.len()
    }

    /// 读取缓存，未命中或出错都返回 None
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "Discarding undecodable cache entry");
                    let _ = self.store.delete(key).await;
                    None
                }
            },
            Ok(None) => {
                debug!(key, "Cache miss");
                // 条目可能已被 TTL 或容量淘汰
                self.index.lock().await.forget_idle(key);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to database");
                None
            }
        }
    }

    /// 写入缓存并登记标签
    pub async fn put_json<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        tags: &[String],
        ttl: Option<Duration>,
    ) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        // 先登记再写入，写入期间的失效才能找到该键
        self.index.lock().await.register(key, tags);

        let written = self.store.set(key, &raw, ttl).await;
        let mut index = self.index.lock().await;
        index.settle(key);
        if let Err(e) = written {
            warn!(key, error = %e, "Cache write failed");
            index.forget_idle(key);
        }
    }

    /// 读穿：命中直接返回，否则执行 `load` 并按默认 TTL 写回
    pub async fn get_or_load<T, F, Fut>(&self, key: &str, tags: &[String], load: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.get_or_load_with_ttl(key, tags, move || async move {
            load().await.map(|value| (value, None))
        })
        .await
    }

    /// 读穿，由 `load` 同时给出结果的 TTL
    ///
    /// TTL 为零的结果不写回。
    pub async fn get_or_load_with_ttl<T, F, Fut>(
        &self,
        key: &str,
        tags: &[String],
        load: F,
    ) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<(T, Option<Duration>)>>,
    {
        if let Some(value) = self.get_json(key).await {
            return Ok(value);
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        let (value, ttl) = load().await?;
        if ttl == Some(Duration::ZERO) {
            return Ok(value);
        }
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(key, "Skipping cache write after concurrent invalidation");
            return Ok(value);
        }

        self.put_json(key, &value, tags, ttl).await;
        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!(key, "Dropping cache entry written across an invalidation");
            if let Err(e) = self.store.delete(key).await {
                warn!(key, error = %e, "Cache eviction failed");
            }
            self.index.lock().await.forget_idle(key);
        }
        Ok(value)
    }
}

/// 距 `until` 的剩余时长，不超过 `cap`；已过期返回零
pub fn ttl_until(until: Option<DateTime<Utc>>, cap: Duration) -> Duration {
    match until {
        Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO).min(cap),
        None => cap,
    }
}

/// 指标标签只取前缀，避免按实体 ID 产生高基数
fn tag_kind(tag: &str) -> String {
    tag.split(':').next().unwrap_or(tag).to_string()
}

#[async_trait]
impl TagInvalidator for TaggedCache {
    async fn invalidate_tags(&self, tags: &[String]) -> AppResult<()> {
        self.epoch.fetch_add(1, Ordering::AcqRel);

        let keys = self.index.lock().await.take(tags);

        for key in &keys {
            if let Err(e) = self.store.delete(key).await {
                warn!(key = %key, error = %e, "Cache eviction failed");
            }
        }

        for tag in tags {
            counter!("cache_invalidations_total", "tag" => tag_kind(tag)).increment(1);
        }
        debug!(tags = ?tags, evicted = keys.len(), "Cache tags invalidated");
        Ok(())
    }
}
