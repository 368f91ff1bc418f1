//! 角色实体与优先级规则

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::{AuditInfo, UserId};

use super::normalize_name;
use super::permission::ResourcePermissionId;
use crate::error::AccessError;

entity_id!(
    /// 角色 ID
    RoleId
);

entity_id!(
    /// 角色-权限授予 ID
    RolePermissionId
);

/// 角色优先级，数值越小权限越高
///
/// 只接受 `[1, 999]` 区间内的整数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct RolePriority(i32);

impl RolePriority {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 999;

    pub fn new(value: i32) -> Result<Self, AccessError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AccessError::InvalidPriority)
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// 是否严格高于 `other` 的权限
    pub fn outranks(self, other: RolePriority) -> bool {
        self.0 < other.0
    }

    pub fn tier(self) -> PriorityTier {
        PriorityTier::of(self)
    }

    /// 校验操作者能否管理目标优先级的角色
    ///
    /// `actor` 为操作者当前生效角色中的最高优先级；没有生效角色时为 `None`。
    /// 同级角色之间不能互相管理。
    pub fn ensure_can_manage(
        actor: Option<RolePriority>,
        target: RolePriority,
    ) -> Result<(), AccessError> {
        match actor {
            Some(actor) if actor.outranks(target) => Ok(()),
            _ => Err(AccessError::InsufficientPrivileges),
        }
    }
}

impl TryFrom<i32> for RolePriority {
    type Error = AccessError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RolePriority> for i32 {
    fn from(priority: RolePriority) -> Self {
        priority.0
    }
}

impl std::fmt::Display for RolePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 优先级分层约定，仅用于展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    SystemAdmin,
    Admin,
    Manager,
    Staff,
    Customer,
}

impl PriorityTier {
    pub fn of(priority: RolePriority) -> Self {
        match priority.value() {
            1..=10 => Self::SystemAdmin,
            11..=30 => Self::Admin,
            31..=50 => Self::Manager,
            51..=100 => Self::Staff,
            _ => Self::Customer,
        }
    }
}

/// 角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub priority: RolePriority,
    pub audit_info: AuditInfo,
}

impl Role {
    pub fn new(name: &str, priority: RolePriority) -> Result<Self, AccessError> {
        Ok(Self {
            id: RoleId::new(),
            name: normalize_name("Role", name)?,
            priority,
            audit_info: AuditInfo::new(),
        })
    }

    /// 修改名称与优先级
    pub fn update(&mut self, name: &str, priority: RolePriority) -> Result<(), AccessError> {
        self.name = normalize_name("Role", name)?;
        self.priority = priority;
        self.audit_info.touch();
        Ok(())
    }
}

/// 角色-权限授予：角色可对某资源执行某操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    pub id: RolePermissionId,
    pub role_id: RoleId,
    pub resource_permission_id: ResourcePermissionId,
    pub granted_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
}

impl RolePermission {
    pub fn new(
        role_id: RoleId,
        resource_permission_id: ResourcePermissionId,
        assigned_by: Option<UserId>,
    ) -> Self {
        Self {
            id: RolePermissionId::new(),
            role_id,
            resource_permission_id,
            granted_at: Utc::now(),
            assigned_by,
        }
    }
}
