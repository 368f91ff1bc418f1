//! 仓储接口
//!
//! 写侧仓储由 Unit of Work 在同一事务内提供；读侧查询走连接池。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storefront_common::{PagedResult, Pagination, UserId};
use storefront_errors::AppResult;

use super::permission::{Permission, PermissionId, ResourcePermission, ResourcePermissionId};
use super::resource::{Resource, ResourceId};
use super::role::{Role, RoleId, RolePermission, RolePriority};
use super::user_role::UserRole;
use super::views::{
    ActiveGrant, PermissionFilter, PermissionSummary, ResourceSummary, RoleFilter, RoleGrant,
    RoleSummary, RoleUser, RoleView, UserRoleView,
};

/// 资源-权限绑定的选择范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingScope {
    Resource(ResourceId),
    Permission(PermissionId),
}

/// 资源仓储接口
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn create(&self, resource: &Resource) -> AppResult<()>;

    async fn update(&self, resource: &Resource) -> AppResult<()>;

    async fn delete(&self, id: &ResourceId) -> AppResult<()>;

    async fn find_by_id(&self, id: &ResourceId) -> AppResult<Option<Resource>>;

    /// 批量查找，不存在的 ID 被忽略
    async fn find_by_ids(&self, ids: &[ResourceId]) -> AppResult<Vec<Resource>>;

    /// 名称是否已被占用，`exclude` 用于更新时排除自身
    async fn exists_by_name(&self, name: &str, exclude: Option<&ResourceId>) -> AppResult<bool>;
}

/// 权限仓储接口
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn create(&self, permission: &Permission) -> AppResult<()>;

    async fn update(&self, permission: &Permission) -> AppResult<()>;

    async fn delete(&self, id: &PermissionId) -> AppResult<()>;

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>>;

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>>;

    async fn exists_by_name(&self, name: &str, exclude: Option<&PermissionId>)
    -> AppResult<bool>;
}

/// 资源-权限绑定仓储接口
#[async_trait]
pub trait ResourcePermissionRepository: Send + Sync {
    async fn find(
        &self,
        resource_id: &ResourceId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<ResourcePermission>>;

    /// 插入绑定；同一 (资源, 权限) 已存在时跳过，返回是否插入
    async fn insert_if_absent(&self, binding: &ResourcePermission) -> AppResult<bool>;

    /// 某权限当前绑定的全部资源
    async fn list_by_permission(
        &self,
        permission_id: &PermissionId,
    ) -> AppResult<Vec<ResourcePermission>>;

    async fn delete(&self, id: &ResourcePermissionId) -> AppResult<()>;

    /// 范围内仍被角色授予引用的绑定数量
    async fn count_granted(&self, scope: BindingScope) -> AppResult<u64>;

    /// 删除范围内的全部绑定，返回删除条数
    async fn delete_by_scope(&self, scope: BindingScope) -> AppResult<u64>;
}

/// 角色仓储接口
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: &Role) -> AppResult<()>;

    async fn update(&self, role: &Role) -> AppResult<()>;

    async fn delete(&self, id: &RoleId) -> AppResult<()>;

    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>>;

    async fn exists_by_name(&self, name: &str, exclude: Option<&RoleId>) -> AppResult<bool>;
}

/// 角色-权限授予仓储接口
#[async_trait]
pub trait RolePermissionRepository: Send + Sync {
    /// 授予绑定；已授予时跳过，返回是否插入
    async fn grant(&self, grant: &RolePermission) -> AppResult<bool>;

    /// 清空角色的全部授予，返回删除条数
    async fn clear(&self, role_id: &RoleId) -> AppResult<u64>;

    /// 撤销所有角色对某绑定的授予
    async fn revoke_binding(&self, binding_id: &ResourcePermissionId) -> AppResult<u64>;
}

/// 用户角色仓储接口
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// 插入或刷新授予
    async fn upsert(&self, grant: &UserRole) -> AppResult<()>;

    async fn remove(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<u64>;

    /// 删除角色的全部授予 (含已过期)
    async fn delete_by_role(&self, role_id: &RoleId) -> AppResult<u64>;

    /// 角色当前生效的授予数量
    async fn count_active_by_role(&self, role_id: &RoleId) -> AppResult<u64>;

    /// 用户生效角色中的最高优先级 (最小数值)
    async fn highest_priority(&self, user_id: &UserId) -> AppResult<Option<RolePriority>>;
}

/// RBAC 读侧查询接口
///
/// 所有涉及用户授予的查询都只返回未过期的记录。
#[async_trait]
pub trait RbacQueryRepository: Send + Sync {
    async fn list_resources(&self) -> AppResult<Vec<ResourceSummary>>;

    async fn find_resource(&self, id: &ResourceId) -> AppResult<Option<ResourceSummary>>;

    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<PermissionSummary>>;

    /// 按 priority 升序、name 升序排列
    async fn list_roles(
        &self,
        filter: &RoleFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RoleSummary>>;

    async fn find_role(&self, id: &RoleId) -> AppResult<Option<RoleView>>;

    async fn role_grants(&self, id: &RoleId) -> AppResult<Vec<RoleGrant>>;

    async fn role_users(&self, id: &RoleId) -> AppResult<Vec<RoleUser>>;

    async fn user_roles(&self, user_id: &UserId) -> AppResult<Vec<UserRoleView>>;

    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveGrant>>;

    /// 最近一个尚未到期的授予到期时间，用于限制聚合结果的缓存时长
    async fn next_grant_expiry(&self) -> AppResult<Option<DateTime<Utc>>>;
}
