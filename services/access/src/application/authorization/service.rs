//! 授权检查服务
//!
//! 回答 "该用户能否对资源 R 执行操作 A"：汇总用户所有生效角色的授予并判断成员关系。
//! 用户身份由调用方显式传入。

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use storefront_common::UserId;
use storefront_errors::{AppError, AppResult};
use tracing::{debug, warn};

use crate::domain::rbac::views::ActiveGrant;
use crate::domain::rbac::{RbacQueryRepository, tags};
use crate::infrastructure::cache::{TaggedCache, ttl_until};

/// 用户拥有的一条 (资源, 操作)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GrantedPermission {
    pub resource: String,
    pub action: String,
}

/// 授权服务
pub struct AuthorizationService {
    queries: Arc<dyn RbacQueryRepository>,
    cache: Option<Arc<TaggedCache>>,
    default_ttl: Duration,
}

impl AuthorizationService {
    pub fn new(queries: Arc<dyn RbacQueryRepository>) -> Self {
        Self {
            queries,
            cache: None,
            default_ttl: Duration::from_secs(3600),
        }
    }

    pub fn with_cache(mut self, cache: Arc<TaggedCache>, default_ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.default_ttl = default_ttl;
        self
    }

    /// 执行授权检查，错误原样返回
    pub async fn check(&self, user_id: &UserId, action: &str, resource: &str) -> AppResult<bool> {
        let start = Instant::now();

        let result = self.check_internal(user_id, action.trim(), resource.trim()).await;

        match &result {
            Ok(allowed) => {
                counter!("authorization_checks_total", "allowed" => allowed.to_string())
                    .increment(1);
            }
            Err(_) => counter!("authorization_checks_errors_total").increment(1),
        }
        histogram!("authorization_check_duration_ms").record(start.elapsed().as_millis() as f64);

        result
    }

    /// 布尔形式的授权检查
    ///
    /// 没有用户或检查出错时一律拒绝，不会返回错误。
    pub async fn has_permission(&self, user_id: Option<&UserId>, action: &str, resource: &str) -> bool {
        let Some(user_id) = user_id else {
            debug!(action, resource, "No user identity, denying");
            counter!("authorization_checks_total", "allowed" => "false").increment(1);
            return false;
        };

        match self.check(user_id, action, resource).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(user_id = %user_id, action, resource, error = %e, "Authorization check failed, denying");
                false
            }
        }
    }

    /// 用户当前拥有的全部 (资源, 操作)，去重并排序
    pub async fn user_permissions(&self, user_id: &UserId) -> AppResult<Vec<GrantedPermission>> {
        let now = Utc::now();
        let set: BTreeSet<GrantedPermission> = self
            .active_grants(user_id)
            .await?
            .into_iter()
            .filter(|g| g.expires_at.is_none_or(|at| at > now))
            .map(|g| GrantedPermission {
                resource: g.resource,
                action: g.action,
            })
            .collect();
        Ok(set.into_iter().collect())
    }

    async fn check_internal(&self, user_id: &UserId, action: &str, resource: &str) -> AppResult<bool> {
        let now = Utc::now();
        let grants = self.active_grants(user_id).await?;
        let allowed = grants.iter().any(|g| {
            g.resource == resource && g.action == action && g.expires_at.is_none_or(|at| at > now)
        });

        debug!(user_id = %user_id, action, resource, allowed, "Authorization decision");
        Ok(allowed)
    }

    /// 读取用户的生效授予 (优先使用缓存)
    ///
    /// 缓存时长不超过这些授予中最早的到期时间。
    async fn active_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveGrant>> {
        let Some(cache) = &self.cache else {
            return self.queries.user_grants(user_id).await;
        };

        let key = format!("user:{}:grants", user_id);
        let cache_tags = [tags::user(user_id), tags::ROLES.to_string()];
        cache
            .get_or_load_with_ttl(&key, &cache_tags, || async {
                let grants = self.queries.user_grants(user_id).await?;
                let earliest = grants.iter().filter_map(|g| g.expires_at).min();
                Ok::<_, AppError>((grants, Some(ttl_until(earliest, self.default_ttl))))
            })
            .await
    }
}
