//! 权限相关命令定义

use serde::Serialize;
use storefront_common::UserId;

/// 创建权限命令
#[derive(Debug, Clone)]
pub struct CreatePermissionCommand {
    pub name: String,
}

/// 重命名权限命令
#[derive(Debug, Clone)]
pub struct UpdatePermissionCommand {
    pub permission_id: String,
    pub name: String,
}

/// 删除权限命令
#[derive(Debug, Clone)]
pub struct DeletePermissionCommand {
    pub permission_id: String,
}

/// 把权限绑定到一组资源
#[derive(Debug, Clone)]
pub struct AssignResourcesToPermissionCommand {
    pub permission_id: String,
    pub resource_ids: Vec<String>,
    /// 执行操作的用户 ID (用于审计)
    pub assigned_by: Option<UserId>,
}

/// 解除权限与一组资源的绑定
#[derive(Debug, Clone)]
pub struct RemoveResourcesFromPermissionCommand {
    pub permission_id: String,
    pub resource_ids: Vec<String>,
}

/// 资源绑定结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingOutcome {
    /// 新建的绑定数
    pub created: u64,
    /// 已存在的绑定数
    pub existing: u64,
}

/// 解除绑定结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbindOutcome {
    pub removed: u64,
    /// 随绑定一起撤销的角色授予数
    pub grants_revoked: u64,
}
