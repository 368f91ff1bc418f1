//! 用户角色命令处理器

use std::sync::Arc;

use storefront_common::UserId;
use storefront_errors::AppResult;
use tracing::info;

use super::commands::*;
use crate::application::events::EventDispatcher;
use crate::application::transaction::complete;
use crate::domain::rbac::{RbacEvent, RoleId, UserRole};
use crate::domain::{UnitOfWork, UnitOfWorkFactory};
use crate::error::{AccessError, parse_id};

pub struct UserRoleCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    events: Arc<EventDispatcher>,
}

impl UserRoleCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, events: Arc<EventDispatcher>) -> Self {
        Self {
            uow_factory,
            events,
        }
    }

    /// 分配角色
    pub async fn handle_assign(&self, cmd: AssignRoleToUserCommand) -> AppResult<UserRole> {
        let user_id: UserId = parse_id(&cmd.user_id, "user")?;
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;
        let grant = UserRole::new(user_id, role_id, cmd.assigned_by, cmd.expires_at)?;

        let uow = self.uow_factory.begin().await?;
        let result = assign(uow.as_ref(), &grant).await;
        complete(uow, result).await?;

        info!(
            user_id = %user_id,
            role_id = %role_id,
            expires_at = ?grant.expires_at,
            "Role assigned to user"
        );
        self.events
            .dispatch(&[RbacEvent::UserRoleAssigned {
                user_id,
                role_id,
                expires_at: grant.expires_at,
                by: grant.assigned_by,
            }])
            .await;

        Ok(grant)
    }

    /// 移除角色，返回是否确实删除了记录
    pub async fn handle_remove(&self, cmd: RemoveRoleFromUserCommand) -> AppResult<bool> {
        let user_id: UserId = parse_id(&cmd.user_id, "user")?;
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;

        let uow = self.uow_factory.begin().await?;
        let result = uow.user_roles().remove(&user_id, &role_id).await;
        let removed = complete(uow, result).await? > 0;

        if removed {
            info!(user_id = %user_id, role_id = %role_id, "Role removed from user");
            self.events
                .dispatch(&[RbacEvent::UserRoleRemoved { user_id, role_id }])
                .await;
        }

        Ok(removed)
    }
}

async fn assign(uow: &dyn UnitOfWork, grant: &UserRole) -> AppResult<()> {
    uow.roles()
        .find_by_id(&grant.role_id)
        .await?
        .ok_or(AccessError::RoleNotFound)?;
    uow.user_roles().upsert(grant).await
}
