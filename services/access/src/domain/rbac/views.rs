//! 读模型
//!
//! 列表与详情查询返回的投影结构，序列化后直接交给调用方或写入缓存。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::UserId;

use super::permission::{PermissionId, ResourcePermissionId};
use super::resource::ResourceId;
use super::role::{PriorityTier, RoleId, RolePriority};
use crate::error::AccessError;

/// 角色列表预览中最多展示的权限/用户数量
pub const SAMPLE_SIZE: i64 = 3;

/// 权限列表过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFilter {
    pub search: Option<String>,
    pub resource_id: Option<ResourceId>,
}

impl PermissionFilter {
    /// 规范化后的搜索词，空白视为未设置
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// 角色列表过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFilter {
    pub search: Option<String>,
    pub priority_min: Option<i32>,
    pub priority_max: Option<i32>,
    pub has_users: Option<bool>,
}

impl RoleFilter {
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), AccessError> {
        if let (Some(min), Some(max)) = (self.priority_min, self.priority_max) {
            if min > max {
                return Err(AccessError::InvalidPriorityRange);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRef {
    pub id: RoleId,
    pub name: String,
    pub priority: RolePriority,
}

/// 资源列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: ResourceId,
    pub name: String,
    pub permission_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 权限列表项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSummary {
    pub id: PermissionId,
    pub name: String,
    pub resource_count: u64,
    pub role_count: u64,
    pub resources: Vec<ResourceRef>,
    pub roles: Vec<RoleRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 角色被授予的一条 (资源, 操作)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub resource_permission_id: ResourcePermissionId,
    pub permission_id: PermissionId,
    pub permission_name: String,
    pub resource_id: ResourceId,
    pub resource_name: String,
    pub granted_at: DateTime<Utc>,
}

/// 持有角色的用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUser {
    pub user_id: UserId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 角色基本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub id: RoleId,
    pub name: String,
    pub priority: RolePriority,
    pub tier: PriorityTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 角色列表项，附带计数与预览
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
    pub priority: RolePriority,
    pub tier: PriorityTier,
    pub permission_count: u64,
    pub resource_count: u64,
    pub user_count: u64,
    pub sample_permissions: Vec<RoleGrant>,
    pub sample_users: Vec<RoleUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 按权限分组的授予
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub permission_id: PermissionId,
    pub permission_name: String,
    pub resource_count: u64,
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleStats {
    pub permission_count: u64,
    pub resource_count: u64,
    pub grant_count: u64,
    pub user_count: u64,
}

/// 角色详情
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDetail {
    pub role: RoleView,
    pub permissions: Vec<PermissionGroup>,
    pub users: Vec<RoleUser>,
    pub stats: RoleStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionsSummary {
    pub total_permissions: u64,
    pub total_resources: u64,
    pub total_grants: u64,
}

/// 角色权限视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionsView {
    pub role: RoleView,
    pub permissions: Vec<PermissionGroup>,
    pub summary: RolePermissionsSummary,
}

/// 用户当前生效的角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleView {
    pub role_id: RoleId,
    pub role_name: String,
    pub priority: RolePriority,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 用户经由某个生效角色获得的 (资源, 操作)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveGrant {
    pub resource: String,
    pub action: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 按权限分组，保持首次出现的顺序
///
/// `include_resources` 为 false 时只保留计数。
pub fn group_by_permission(grants: &[RoleGrant], include_resources: bool) -> Vec<PermissionGroup> {
    let mut order: Vec<PermissionId> = Vec::new();
    let mut groups: BTreeMap<PermissionId, PermissionGroup> = BTreeMap::new();

    for grant in grants {
        let group = groups.entry(grant.permission_id).or_insert_with(|| {
            order.push(grant.permission_id);
            PermissionGroup {
                permission_id: grant.permission_id,
                permission_name: grant.permission_name.clone(),
                resource_count: 0,
                resources: Vec::new(),
            }
        });
        group.resource_count += 1;
        if include_resources {
            group.resources.push(ResourceRef {
                id: grant.resource_id,
                name: grant.resource_name.clone(),
            });
        }
    }

    order
        .into_iter()
        .filter_map(|id| groups.remove(&id))
        .collect()
}

/// 汇总授予中不同权限、资源的数量
pub fn summarize_grants(grants: &[RoleGrant]) -> RolePermissionsSummary {
    let permissions: std::collections::HashSet<_> = grants.iter().map(|g| g.permission_id).collect();
    let resources: std::collections::HashSet<_> = grants.iter().map(|g| g.resource_id).collect();
    RolePermissionsSummary {
        total_permissions: permissions.len() as u64,
        total_resources: resources.len() as u64,
        total_grants: grants.len() as u64,
    }
}
