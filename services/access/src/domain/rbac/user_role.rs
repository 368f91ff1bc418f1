//! 用户-角色授予

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::UserId;

use super::role::RoleId;
use crate::error::AccessError;

/// 授予状态
///
/// `absent → active → expired → absent`；过期记录不会被主动清理，
/// 只在读取时按 `expires_at` 过滤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    Active,
    Expired,
}

/// 用户持有的角色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserRole {
    /// 创建授予，`expires_at` 必须晚于当前时间
    pub fn new(
        user_id: UserId,
        role_id: RoleId,
        assigned_by: Option<UserId>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AccessError> {
        let now = Utc::now();
        if matches!(expires_at, Some(at) if at <= now) {
            return Err(AccessError::ExpiryInPast);
        }
        Ok(Self {
            user_id,
            role_id,
            assigned_at: now,
            assigned_by,
            expires_at,
        })
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > at)
    }

    pub fn state_at(&self, at: DateTime<Utc>) -> GrantState {
        if self.is_active_at(at) {
            GrantState::Active
        } else {
            GrantState::Expired
        }
    }
}
