//! 权限实体与资源绑定

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::{AuditInfo, UserId};

use super::normalize_name;
use super::resource::ResourceId;
use crate::error::AccessError;

entity_id!(
    /// 权限 ID
    PermissionId
);

entity_id!(
    /// 资源-权限绑定 ID
    ResourcePermissionId
);

/// 权限：一个操作名，例如 "create"、"read"
///
/// 权限本身与资源无关，通过 [`ResourcePermission`] 绑定到资源后才有意义。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub audit_info: AuditInfo,
}

impl Permission {
    pub fn new(name: &str) -> Result<Self, AccessError> {
        Ok(Self {
            id: PermissionId::new(),
            name: normalize_name("Permission", name)?,
            audit_info: AuditInfo::new(),
        })
    }

    pub fn rename(&mut self, name: &str) -> Result<(), AccessError> {
        self.name = normalize_name("Permission", name)?;
        self.audit_info.touch();
        Ok(())
    }
}

/// 资源-权限绑定：表示 "该操作可作用于该资源"
///
/// (resource_id, permission_id) 唯一。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermission {
    pub id: ResourcePermissionId,
    pub resource_id: ResourceId,
    pub permission_id: PermissionId,
    pub created_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
}

impl ResourcePermission {
    pub fn new(
        resource_id: ResourceId,
        permission_id: PermissionId,
        assigned_by: Option<UserId>,
    ) -> Self {
        Self {
            id: ResourcePermissionId::new(),
            resource_id,
            permission_id,
            created_at: Utc::now(),
            assigned_by,
        }
    }

    pub fn binds(&self, resource_id: &ResourceId, permission_id: &PermissionId) -> bool {
        &self.resource_id == resource_id && &self.permission_id == permission_id
    }
}
