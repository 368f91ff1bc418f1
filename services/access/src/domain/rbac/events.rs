//! RBAC 领域事件
//!
//! 每个成功提交的变更产生一个或多个事件，事件携带需要失效的缓存标签。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::UserId;

use super::permission::PermissionId;
use super::resource::ResourceId;
use super::role::RoleId;

/// 缓存标签
pub mod tags {
    use storefront_common::UserId;

    use crate::domain::rbac::{PermissionId, RoleId};

    pub const RESOURCES: &str = "resources";
    pub const PERMISSIONS: &str = "permissions";
    pub const ROLES: &str = "roles";

    pub fn role(id: &RoleId) -> String {
        format!("role:{}", id)
    }

    pub fn permission(id: &PermissionId) -> String {
        format!("permission:{}", id)
    }

    pub fn user(id: &UserId) -> String {
        format!("user:{}", id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RbacEvent {
    ResourceCreated {
        resource_id: ResourceId,
        name: String,
    },
    ResourceUpdated {
        resource_id: ResourceId,
        name: String,
    },
    ResourceDeleted {
        resource_id: ResourceId,
        bindings_removed: u64,
    },
    PermissionCreated {
        permission_id: PermissionId,
        name: String,
    },
    PermissionUpdated {
        permission_id: PermissionId,
        name: String,
    },
    PermissionDeleted {
        permission_id: PermissionId,
        bindings_removed: u64,
    },
    PermissionResourcesAssigned {
        permission_id: PermissionId,
        resource_ids: Vec<ResourceId>,
        created: u64,
        by: Option<UserId>,
    },
    PermissionResourcesRemoved {
        permission_id: PermissionId,
        resource_ids: Vec<ResourceId>,
        grants_revoked: u64,
    },
    RoleCreated {
        role_id: RoleId,
        name: String,
        priority: i32,
    },
    RoleUpdated {
        role_id: RoleId,
        name: String,
        priority: i32,
        by: Option<UserId>,
    },
    RoleDeleted {
        role_id: RoleId,
        users_affected: u64,
        permissions_removed: u64,
        by: Option<UserId>,
    },
    RolePermissionsAssigned {
        role_id: RoleId,
        assigned: u64,
        skipped: u64,
        by: Option<UserId>,
    },
    RolePermissionsCleared {
        role_id: RoleId,
        removed: u64,
    },
    UserRoleAssigned {
        user_id: UserId,
        role_id: RoleId,
        expires_at: Option<DateTime<Utc>>,
        by: Option<UserId>,
    },
    UserRoleRemoved {
        user_id: UserId,
        role_id: RoleId,
    },
}

impl RbacEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RbacEvent::ResourceCreated { .. } => "ResourceCreated",
            RbacEvent::ResourceUpdated { .. } => "ResourceUpdated",
            RbacEvent::ResourceDeleted { .. } => "ResourceDeleted",
            RbacEvent::PermissionCreated { .. } => "PermissionCreated",
            RbacEvent::PermissionUpdated { .. } => "PermissionUpdated",
            RbacEvent::PermissionDeleted { .. } => "PermissionDeleted",
            RbacEvent::PermissionResourcesAssigned { .. } => "PermissionResourcesAssigned",
            RbacEvent::PermissionResourcesRemoved { .. } => "PermissionResourcesRemoved",
            RbacEvent::RoleCreated { .. } => "RoleCreated",
            RbacEvent::RoleUpdated { .. } => "RoleUpdated",
            RbacEvent::RoleDeleted { .. } => "RoleDeleted",
            RbacEvent::RolePermissionsAssigned { .. } => "RolePermissionsAssigned",
            RbacEvent::RolePermissionsCleared { .. } => "RolePermissionsCleared",
            RbacEvent::UserRoleAssigned { .. } => "UserRoleAssigned",
            RbacEvent::UserRoleRemoved { .. } => "UserRoleRemoved",
        }
    }

    /// 该事件使哪些缓存标签失效
    ///
    /// 用户授权缓存同时挂在 `roles` 标签下，所以任何角色或授予变化都会使其失效。
    pub fn cache_tags(&self) -> Vec<String> {
        use tags::*;

        let own = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        match self {
            RbacEvent::ResourceCreated { .. }
            | RbacEvent::ResourceUpdated { .. }
            | RbacEvent::ResourceDeleted { .. } => own(&[RESOURCES, ROLES, PERMISSIONS]),
            RbacEvent::PermissionCreated { .. } => own(&[PERMISSIONS]),
            RbacEvent::PermissionUpdated { permission_id, .. }
            | RbacEvent::PermissionDeleted { permission_id, .. }
            | RbacEvent::PermissionResourcesAssigned { permission_id, .. }
            | RbacEvent::PermissionResourcesRemoved { permission_id, .. } => {
                let mut tags = own(&[PERMISSIONS, RESOURCES, ROLES]);
                tags.push(permission(permission_id));
                tags
            }
            RbacEvent::RoleCreated { .. } => own(&[ROLES]),
            RbacEvent::RoleUpdated { role_id, .. }
            | RbacEvent::RoleDeleted { role_id, .. }
            | RbacEvent::RolePermissionsAssigned { role_id, .. }
            | RbacEvent::RolePermissionsCleared { role_id, .. } => {
                let mut tags = own(&[ROLES, PERMISSIONS]);
                tags.push(role(role_id));
                tags
            }
            RbacEvent::UserRoleAssigned {
                user_id, role_id, ..
            }
            | RbacEvent::UserRoleRemoved { user_id, role_id } => {
                let mut tags = own(&[ROLES]);
                tags.push(role(role_id));
                tags.push(user(user_id));
                tags
            }
        }
    }
}
