//! 查询处理器
//!
//! 所有读取都经过 [`TaggedCache`]；涉及用户授予的结果，缓存时长不超过
//! 最近一个授予的到期时间。

use std::sync::Arc;
use std::time::Duration;

use storefront_common::{PagedResult, Pagination, UserId};
use storefront_errors::{AppError, AppResult};

use super::queries::*;
use crate::domain::rbac::views::{
    PermissionFilter, PermissionSummary, ResourceSummary, RoleDetail, RoleFilter,
    RolePermissionsView, RoleStats, RoleSummary, UserRoleView, group_by_permission,
    summarize_grants,
};
use crate::domain::rbac::{RbacQueryRepository, ResourceId, RoleId, tags};
use crate::error::{AccessError, parse_id};
use crate::infrastructure::cache::{TaggedCache, ttl_until};

/// 查询处理器
pub struct RbacQueryHandler {
    queries: Arc<dyn RbacQueryRepository>,
    cache: Arc<TaggedCache>,
    default_ttl: Duration,
}

impl RbacQueryHandler {
    pub fn new(
        queries: Arc<dyn RbacQueryRepository>,
        cache: Arc<TaggedCache>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            queries,
            cache,
            default_ttl,
        }
    }

    /// 聚合了用户授予的结果可以缓存多久
    async fn grant_bounded_ttl(&self) -> AppResult<Option<Duration>> {
        let next = self.queries.next_grant_expiry().await?;
        Ok(Some(ttl_until(next, self.default_ttl)))
    }

    /// 全部资源
    pub async fn handle_get_resources(&self) -> AppResult<Vec<ResourceSummary>> {
        self.cache
            .get_or_load("resources:all", &[tags::RESOURCES.to_string()], || {
                self.queries.list_resources()
            })
            .await
    }

    /// 单个资源
    pub async fn handle_get_resource(&self, resource_id: &str) -> AppResult<ResourceSummary> {
        let id: ResourceId = parse_id(resource_id, "resource")?;
        let found = self
            .cache
            .get_or_load(
                &format!("resources:{}", id),
                &[tags::RESOURCES.to_string()],
                || self.queries.find_resource(&id),
            )
            .await?;
        Ok(found.ok_or(AccessError::ResourceNotFound)?)
    }

    /// 分页获取权限
    pub async fn handle_get_permissions(
        &self,
        query: GetPermissionsQuery,
    ) -> AppResult<PagedResult<PermissionSummary>> {
        let pagination = Pagination::new(query.page, query.limit);
        let filter = PermissionFilter {
            search: query.search.clone(),
            resource_id: query
                .resource_id
                .as_deref()
                .map(|raw| parse_id(raw, "resource"))
                .transpose()?,
        };

        let key = format!(
            "permissions:list:{}:{}:{}:{}",
            pagination.page,
            pagination.limit,
            filter.search_term().unwrap_or(""),
            filter.resource_id.map(|id| id.to_string()).unwrap_or_default()
        );
        self.cache
            .get_or_load(&key, &[tags::PERMISSIONS.to_string()], || {
                self.queries.list_permissions(&filter, &pagination)
            })
            .await
    }

    /// 分页获取角色，按优先级升序、名称升序
    pub async fn handle_get_roles(&self, query: GetRolesQuery) -> AppResult<PagedResult<RoleSummary>> {
        let pagination = Pagination::new(query.page, query.limit);
        let filter = RoleFilter {
            search: query.search.clone(),
            priority_min: query.priority_min,
            priority_max: query.priority_max,
            has_users: query.has_users,
        };
        filter.validate()?;

        let key = format!(
            "roles:list:{}:{}:{}:{:?}:{:?}:{:?}",
            pagination.page,
            pagination.limit,
            filter.search_term().unwrap_or(""),
            filter.priority_min,
            filter.priority_max,
            filter.has_users
        );
        self.cache
            .get_or_load_with_ttl(&key, &[tags::ROLES.to_string()], || async {
                let page = self.queries.list_roles(&filter, &pagination).await?;
                Ok::<_, AppError>((page, self.grant_bounded_ttl().await?))
            })
            .await
    }

    /// 角色详情：按权限分组的授予、生效用户与统计
    pub async fn handle_get_role(&self, role_id: &str) -> AppResult<RoleDetail> {
        let id: RoleId = parse_id(role_id, "role")?;
        let cache_tags = [tags::ROLES.to_string(), tags::role(&id)];

        let detail = self
            .cache
            .get_or_load_with_ttl(&format!("role:{}:detail", id), &cache_tags, || async {
                let Some(role) = self.queries.find_role(&id).await? else {
                    return Ok((None, Some(Duration::ZERO)));
                };
                let grants = self.queries.role_grants(&id).await?;
                let users = self.queries.role_users(&id).await?;
                let summary = summarize_grants(&grants);
                let detail = RoleDetail {
                    role,
                    permissions: group_by_permission(&grants, true),
                    stats: RoleStats {
                        permission_count: summary.total_permissions,
                        resource_count: summary.total_resources,
                        grant_count: summary.total_grants,
                        user_count: users.len() as u64,
                    },
                    users,
                };
                Ok::<_, AppError>((Some(detail), self.grant_bounded_ttl().await?))
            })
            .await?;

        Ok(detail.ok_or(AccessError::RoleNotFound)?)
    }

    /// 角色权限
    pub async fn handle_get_role_permissions(
        &self,
        query: GetRolePermissionsQuery,
    ) -> AppResult<RolePermissionsView> {
        let id: RoleId = parse_id(&query.role_id, "role")?;
        let key = format!("role:{}:permissions:{}", id, query.include_resource_details);
        let cache_tags = [tags::ROLES.to_string(), tags::role(&id)];

        let view = self
            .cache
            .get_or_load_with_ttl(&key, &cache_tags, || async {
                let Some(role) = self.queries.find_role(&id).await? else {
                    return Ok((None, Some(Duration::ZERO)));
                };
                let grants = self.queries.role_grants(&id).await?;
                Ok::<_, AppError>((
                    Some(RolePermissionsView {
                        role,
                        permissions: group_by_permission(&grants, query.include_resource_details),
                        summary: summarize_grants(&grants),
                    }),
                    None,
                ))
            })
            .await?;

        Ok(view.ok_or(AccessError::RoleNotFound)?)
    }

    /// 用户当前生效的角色，按优先级升序
    pub async fn handle_get_user_roles(&self, user_id: &str) -> AppResult<Vec<UserRoleView>> {
        let user_id: UserId = parse_id(user_id, "user")?;
        let cache_tags = [tags::user(&user_id), tags::ROLES.to_string()];

        self.cache
            .get_or_load_with_ttl(&format!("user:{}:roles", user_id), &cache_tags, || async {
                let roles = self.queries.user_roles(&user_id).await?;
                let earliest = roles.iter().filter_map(|r| r.expires_at).min();
                Ok::<_, AppError>((roles, Some(ttl_until(earliest, self.default_ttl))))
            })
            .await
    }
}
