//! 用户角色命令定义

use chrono::{DateTime, Utc};
use storefront_common::UserId;

/// 为用户分配角色
///
/// 已存在的分配会被刷新 (assigned_at / assigned_by / expires_at)。
#[derive(Debug, Clone)]
pub struct AssignRoleToUserCommand {
    pub user_id: String,
    pub role_id: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub assigned_by: Option<UserId>,
}

/// 移除用户角色，不存在时不报错
#[derive(Debug, Clone)]
pub struct RemoveRoleFromUserCommand {
    pub user_id: String,
    pub role_id: String,
}
