//! RBAC 领域模块
//!
//! 资源 (Resource) × 操作 (Permission) 构成绑定 (ResourcePermission)，
//! 角色 (Role) 持有一组绑定，用户通过 UserRole 获得角色。

#![allow(clippy::module_inception)]

/// 定义基于 UUID v7 的实体 ID 类型
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s.trim())?))
            }
        }
    };
}

pub mod events;
pub mod permission;
pub mod repository;
pub mod resource;
pub mod role;
pub mod user_role;
pub mod views;

pub use events::{RbacEvent, tags};
pub use permission::{Permission, PermissionId, ResourcePermission, ResourcePermissionId};
pub use repository::{
    BindingScope, PermissionRepository, RbacQueryRepository, ResourcePermissionRepository,
    ResourceRepository, RolePermissionRepository, RoleRepository, UserRoleRepository,
};
pub use resource::{Resource, ResourceId};
pub use role::{PriorityTier, Role, RoleId, RolePermission, RolePermissionId, RolePriority};
pub use user_role::{GrantState, UserRole};

use crate::error::AccessError;

/// 名称最大长度
pub const MAX_NAME_LEN: usize = 100;

/// 规范化并校验实体名称
///
/// 去除首尾空白；空名称或超长名称返回校验错误。
pub fn normalize_name(kind: &'static str, name: &str) -> Result<String, AccessError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AccessError::NameRequired(kind));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AccessError::NameTooLong(kind, MAX_NAME_LEN));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name_trims() {
        assert_eq!(normalize_name("Resource", "  products ").unwrap(), "products");
    }

    #[test]
    fn test_normalize_name_rejects_blank() {
        assert!(matches!(
            normalize_name("Permission", "   "),
            Err(AccessError::NameRequired("Permission"))
        ));
    }

    #[test]
    fn test_normalize_name_rejects_long() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(normalize_name("Role", &long).is_err());
    }

    #[test]
    fn test_entity_id_parse() {
        let id = ResourceId::new();
        let parsed: ResourceId = format!(" {} ", id).parse().unwrap();
        assert_eq!(id, parsed);
        assert!("42".parse::<RoleId>().is_err());
    }
}
