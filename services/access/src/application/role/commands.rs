//! 角色相关命令定义

use serde::Serialize;
use storefront_common::UserId;

use crate::domain::rbac::{PermissionId, ResourceId, ResourcePermissionId, Role};
use crate::error::AccessError;

/// 创建角色命令
#[derive(Debug, Clone)]
pub struct CreateRoleCommand {
    pub name: String,
    pub priority: i32,
}

/// 更新角色命令
#[derive(Debug, Clone)]
pub struct UpdateRoleCommand {
    pub role_id: String,
    pub name: String,
    pub priority: i32,
    /// 提供时执行优先级校验
    pub updated_by: Option<UserId>,
}

/// 删除角色命令
#[derive(Debug, Clone)]
pub struct DeleteRoleCommand {
    pub role_id: String,
    /// 提供时执行优先级校验
    pub deleted_by: Option<UserId>,
}

/// 授予范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantScope {
    /// 每个权限 × 每个指定资源，缺失的绑定按需创建
    Resources(Vec<String>),
    /// 每个权限当前已绑定的全部资源
    AllBoundResources,
}

impl GrantScope {
    /// 由可选的资源列表推导授予范围，空列表视为调用方错误
    pub fn from_resource_ids(resource_ids: Option<Vec<String>>) -> Result<Self, AccessError> {
        match resource_ids {
            None => Ok(Self::AllBoundResources),
            Some(ids) if ids.is_empty() => Err(AccessError::EmptyResourceSelection),
            Some(ids) => Ok(Self::Resources(ids)),
        }
    }
}

/// 为角色授予权限
#[derive(Debug, Clone)]
pub struct AssignPermissionsToRoleCommand {
    pub role_id: String,
    pub permission_ids: Vec<String>,
    pub scope: GrantScope,
    /// 提供时执行优先级校验
    pub assigned_by: Option<UserId>,
}

impl AssignPermissionsToRoleCommand {
    pub fn validate(&self) -> Result<(), AccessError> {
        if self.permission_ids.is_empty() {
            return Err(AccessError::EmptyPermissionSelection);
        }
        if matches!(&self.scope, GrantScope::Resources(ids) if ids.is_empty()) {
            return Err(AccessError::EmptyResourceSelection);
        }
        Ok(())
    }
}

/// 清空角色权限
#[derive(Debug, Clone)]
pub struct ClearRolePermissionsCommand {
    pub role_id: String,
}

/// 单条授予的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Assigned,
    AlreadyAssigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantAssignment {
    pub resource_permission_id: ResourcePermissionId,
    pub permission_id: PermissionId,
    pub resource_id: ResourceId,
    pub status: AssignmentStatus,
}

/// 授予结果：新授予与已存在的数量分开统计，便于重复提交
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionsOutcome {
    pub assigned_count: u64,
    pub skipped_count: u64,
    pub assignments: Vec<GrantAssignment>,
}

/// 删除角色的影响
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeleteImpact {
    pub users_affected: u64,
    pub permissions_removed: u64,
}

#[derive(Debug, Clone)]
pub struct DeleteRoleOutcome {
    pub role: Role,
    pub impact: DeleteImpact,
}
