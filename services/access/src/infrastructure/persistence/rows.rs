//! 数据库行结构与领域对象转换

use chrono::{DateTime, Utc};
use storefront_common::{AuditInfo, UserId};
use storefront_errors::{AppError, AppResult};
use uuid::Uuid;

use crate::domain::rbac::views::{
    ActiveGrant, ResourceSummary, RoleGrant, RoleUser, RoleView, UserRoleView,
};
use crate::domain::rbac::{
    Permission, PermissionId, Resource, ResourceId, ResourcePermission, ResourcePermissionId,
    Role, RoleId, RolePriority,
};

/// 数据库中的 priority 受 CHECK 约束保护，越界只可能是数据损坏
pub(crate) fn priority_from_db(value: i32) -> AppResult<RolePriority> {
    RolePriority::new(value)
        .map_err(|_| AppError::internal(format!("Stored role priority out of range: {}", value)))
}

#[derive(sqlx::FromRow)]
pub(crate) struct ResourceRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRow {
    pub fn into_resource(self) -> Resource {
        Resource {
            id: ResourceId::from_uuid(self.id),
            name: self.name,
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PermissionRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRow {
    pub fn into_permission(self) -> Permission {
        Permission {
            id: PermissionId::from_uuid(self.id),
            name: self.name,
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ResourcePermissionRow {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub permission_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
}

impl ResourcePermissionRow {
    pub fn into_binding(self) -> ResourcePermission {
        ResourcePermission {
            id: ResourcePermissionId::from_uuid(self.id),
            resource_id: ResourceId::from_uuid(self.resource_id),
            permission_id: PermissionId::from_uuid(self.permission_id),
            created_at: self.created_at,
            assigned_by: self.assigned_by.map(UserId::from_uuid),
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoleRow {
    pub fn into_role(self) -> AppResult<Role> {
        Ok(Role {
            id: RoleId::from_uuid(self.id),
            name: self.name,
            priority: priority_from_db(self.priority)?,
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        })
    }

    pub fn into_view(self) -> AppResult<RoleView> {
        let priority = priority_from_db(self.priority)?;
        Ok(RoleView {
            id: RoleId::from_uuid(self.id),
            name: self.name,
            priority,
            tier: priority.tier(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ResourceSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub permission_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResourceSummaryRow> for ResourceSummary {
    fn from(row: ResourceSummaryRow) -> Self {
        Self {
            id: ResourceId::from_uuid(row.id),
            name: row.name,
            permission_count: row.permission_count.max(0) as u64,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoleGrantRow {
    pub role_id: Uuid,
    pub resource_permission_id: Uuid,
    pub permission_id: Uuid,
    pub permission_name: String,
    pub resource_id: Uuid,
    pub resource_name: String,
    pub granted_at: DateTime<Utc>,
}

impl From<RoleGrantRow> for RoleGrant {
    fn from(row: RoleGrantRow) -> Self {
        Self {
            resource_permission_id: ResourcePermissionId::from_uuid(row.resource_permission_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            permission_name: row.permission_name,
            resource_id: ResourceId::from_uuid(row.resource_id),
            resource_name: row.resource_name,
            granted_at: row.granted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct RoleUserRow {
    pub role_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<RoleUserRow> for RoleUser {
    fn from(row: RoleUserRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            assigned_at: row.assigned_at,
            assigned_by: row.assigned_by.map(UserId::from_uuid),
            expires_at: row.expires_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRoleViewRow {
    pub role_id: Uuid,
    pub role_name: String,
    pub priority: i32,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserRoleViewRow {
    pub fn into_view(self) -> AppResult<UserRoleView> {
        Ok(UserRoleView {
            role_id: RoleId::from_uuid(self.role_id),
            role_name: self.role_name,
            priority: priority_from_db(self.priority)?,
            assigned_at: self.assigned_at,
            assigned_by: self.assigned_by.map(UserId::from_uuid),
            expires_at: self.expires_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ActiveGrantRow {
    pub resource: String,
    pub action: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ActiveGrantRow> for ActiveGrant {
    fn from(row: ActiveGrantRow) -> Self {
        Self {
            resource: row.resource,
            action: row.action,
            expires_at: row.expires_at,
        }
    }
}
