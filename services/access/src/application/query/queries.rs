//! 查询定义

use serde::Serialize;

/// 分页获取权限
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetPermissionsQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub resource_id: Option<String>,
}

/// 分页获取角色
#[derive(Debug, Clone, Default, Serialize)]
pub struct GetRolesQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub priority_min: Option<i32>,
    pub priority_max: Option<i32>,
    pub has_users: Option<bool>,
}

/// 获取角色权限
#[derive(Debug, Clone, Serialize)]
pub struct GetRolePermissionsQuery {
    pub role_id: String,
    pub include_resource_details: bool,
}
