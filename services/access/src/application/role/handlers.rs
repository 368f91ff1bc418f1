//! 角色命令处理器

use std::collections::BTreeSet;
use std::sync::Arc;

use storefront_common::UserId;
use storefront_errors::AppResult;
use tracing::{info, warn};

use super::commands::*;
use crate::application::events::EventDispatcher;
use crate::application::permission::handlers::{
    ensure_resources_exist, find_or_create_binding, parse_resource_ids,
};
use crate::application::transaction::complete;
use crate::domain::rbac::{
    PermissionId, RbacEvent, ResourceId, ResourcePermission, Role, RoleId, RolePermission,
    RolePriority, normalize_name,
};
use crate::domain::{UnitOfWork, UnitOfWorkFactory};
use crate::error::{AccessError, parse_id};

/// 角色命令处理器
pub struct RoleCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    events: Arc<EventDispatcher>,
}

impl RoleCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, events: Arc<EventDispatcher>) -> Self {
        Self {
            uow_factory,
            events,
        }
    }

    /// 创建角色
    pub async fn handle_create(&self, cmd: CreateRoleCommand) -> AppResult<Role> {
        let priority = RolePriority::new(cmd.priority)?;
        let role = Role::new(&cmd.name, priority)?;

        let uow = self.uow_factory.begin().await?;
        let result = create(uow.as_ref(), &role).await;
        complete(uow, result).await?;

        info!(role_id = %role.id, name = %role.name, priority = %role.priority, "Role created");
        self.events
            .dispatch(&[RbacEvent::RoleCreated {
                role_id: role.id,
                name: role.name.clone(),
                priority: role.priority.value(),
            }])
            .await;

        Ok(role)
    }

    /// 更新角色名称与优先级
    pub async fn handle_update(&self, cmd: UpdateRoleCommand) -> AppResult<Role> {
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;
        let name = normalize_name("Role", &cmd.name)?;
        let priority = RolePriority::new(cmd.priority)?;

        let uow = self.uow_factory.begin().await?;
        let result = update(uow.as_ref(), &role_id, &name, priority, cmd.updated_by).await;
        let role = complete(uow, result).await?;

        info!(role_id = %role.id, name = %role.name, priority = %role.priority, "Role updated");
        self.events
            .dispatch(&[RbacEvent::RoleUpdated {
                role_id: role.id,
                name: role.name.clone(),
                priority: role.priority.value(),
                by: cmd.updated_by,
            }])
            .await;

        Ok(role)
    }

    /// 删除角色，级联删除其授予与用户分配
    pub async fn handle_delete(&self, cmd: DeleteRoleCommand) -> AppResult<DeleteRoleOutcome> {
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;

        let uow = self.uow_factory.begin().await?;
        let result = delete(uow.as_ref(), &role_id, cmd.deleted_by).await;
        let outcome = complete(uow, result).await?;

        info!(
            role_id = %role_id,
            users_affected = outcome.impact.users_affected,
            permissions_removed = outcome.impact.permissions_removed,
            "Role deleted"
        );
        self.events
            .dispatch(&[RbacEvent::RoleDeleted {
                role_id,
                users_affected: outcome.impact.users_affected,
                permissions_removed: outcome.impact.permissions_removed,
                by: cmd.deleted_by,
            }])
            .await;

        Ok(outcome)
    }

    /// 为角色授予权限
    ///
    /// 已授予的绑定计入 `skipped_count`，重复提交不会报错。
    pub async fn handle_assign_permissions(
        &self,
        cmd: AssignPermissionsToRoleCommand,
    ) -> AppResult<AssignPermissionsOutcome> {
        cmd.validate()?;
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;
        let permission_ids = parse_permission_ids(&cmd.permission_ids)?;
        let scope = match &cmd.scope {
            GrantScope::Resources(raw) => ResolvedScope::Resources(parse_resource_ids(raw)?),
            GrantScope::AllBoundResources => ResolvedScope::AllBound,
        };

        let uow = self.uow_factory.begin().await?;
        let result = assign_permissions(
            uow.as_ref(),
            &role_id,
            &permission_ids,
            &scope,
            cmd.assigned_by,
        )
        .await;
        let outcome = complete(uow, result).await?;

        info!(
            role_id = %role_id,
            assigned = outcome.assigned_count,
            skipped = outcome.skipped_count,
            "Permissions assigned to role"
        );
        self.events
            .dispatch(&[RbacEvent::RolePermissionsAssigned {
                role_id,
                assigned: outcome.assigned_count,
                skipped: outcome.skipped_count,
                by: cmd.assigned_by,
            }])
            .await;

        Ok(outcome)
    }

    /// 清空角色的全部授予
    pub async fn handle_clear_permissions(&self, cmd: ClearRolePermissionsCommand) -> AppResult<u64> {
        let role_id: RoleId = parse_id(&cmd.role_id, "role")?;

        let uow = self.uow_factory.begin().await?;
        let result = clear_permissions(uow.as_ref(), &role_id).await;
        let removed = complete(uow, result).await?;

        info!(role_id = %role_id, removed, "Role permissions cleared");
        self.events
            .dispatch(&[RbacEvent::RolePermissionsCleared { role_id, removed }])
            .await;

        Ok(removed)
    }
}

enum ResolvedScope {
    Resources(Vec<ResourceId>),
    AllBound,
}

fn parse_permission_ids(raw: &[String]) -> Result<Vec<PermissionId>, AccessError> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id: PermissionId = parse_id(value, "permission")?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// 校验操作者的最高优先级严格高于每个目标优先级
///
/// 未提供操作者时跳过；操作者没有生效角色时拒绝。
async fn ensure_actor_can_manage(
    uow: &dyn UnitOfWork,
    actor: Option<UserId>,
    targets: &[RolePriority],
) -> AppResult<()> {
    let Some(actor) = actor else {
        return Ok(());
    };

    let highest = uow.user_roles().highest_priority(&actor).await?;
    for target in targets {
        if let Err(e) = RolePriority::ensure_can_manage(highest, *target) {
            warn!(
                actor = %actor,
                actor_priority = ?highest.map(RolePriority::value),
                target_priority = target.value(),
                "Role management rejected"
            );
            return Err(e.into());
        }
    }
    Ok(())
}

async fn find_role(uow: &dyn UnitOfWork, id: &RoleId) -> AppResult<Role> {
    Ok(uow
        .roles()
        .find_by_id(id)
        .await?
        .ok_or(AccessError::RoleNotFound)?)
}

async fn create(uow: &dyn UnitOfWork, role: &Role) -> AppResult<()> {
    if uow.roles().exists_by_name(&role.name, None).await? {
        return Err(AccessError::RoleAlreadyExists(role.name.clone()).into());
    }
    uow.roles().create(role).await
}

async fn update(
    uow: &dyn UnitOfWork,
    id: &RoleId,
    name: &str,
    priority: RolePriority,
    actor: Option<UserId>,
) -> AppResult<Role> {
    let mut role = find_role(uow, id).await?;
    ensure_actor_can_manage(uow, actor, &[role.priority, priority]).await?;

    if uow.roles().exists_by_name(name, Some(id)).await? {
        return Err(AccessError::RoleAlreadyExists(name.to_string()).into());
    }

    role.update(name, priority)?;
    uow.roles().update(&role).await?;
    Ok(role)
}

async fn delete(
    uow: &dyn UnitOfWork,
    id: &RoleId,
    actor: Option<UserId>,
) -> AppResult<DeleteRoleOutcome> {
    let role = find_role(uow, id).await?;
    ensure_actor_can_manage(uow, actor, &[role.priority]).await?;

    let users_affected = uow.user_roles().count_active_by_role(id).await?;
    let permissions_removed = uow.role_permissions().clear(id).await?;
    uow.user_roles().delete_by_role(id).await?;
    uow.roles().delete(id).await?;

    Ok(DeleteRoleOutcome {
        role,
        impact: DeleteImpact {
            users_affected,
            permissions_removed,
        },
    })
}

async fn assign_permissions(
    uow: &dyn UnitOfWork,
    role_id: &RoleId,
    permission_ids: &[PermissionId],
    scope: &ResolvedScope,
    actor: Option<UserId>,
) -> AppResult<AssignPermissionsOutcome> {
    let role = find_role(uow, role_id).await?;
    ensure_actor_can_manage(uow, actor, &[role.priority]).await?;

    let permissions = uow.permissions().find_by_ids(permission_ids).await?;
    if permissions.len() != permission_ids.len() {
        return Err(AccessError::PermissionNotFound.into());
    }

    let mut bindings: Vec<ResourcePermission> = Vec::new();
    match scope {
        ResolvedScope::Resources(resource_ids) => {
            ensure_resources_exist(uow, resource_ids).await?;
            for permission_id in permission_ids {
                for resource_id in resource_ids {
                    let (binding, _) =
                        find_or_create_binding(uow, resource_id, permission_id, actor).await?;
                    bindings.push(binding);
                }
            }
        }
        ResolvedScope::AllBound => {
            for permission_id in permission_ids {
                bindings.extend(
                    uow.resource_permissions()
                        .list_by_permission(permission_id)
                        .await?,
                );
            }
        }
    }

    let mut outcome = AssignPermissionsOutcome::default();
    for binding in bindings {
        let status = if uow
            .role_permissions()
            .grant(&RolePermission::new(*role_id, binding.id, actor))
            .await?
        {
            outcome.assigned_count += 1;
            AssignmentStatus::Assigned
        } else {
            outcome.skipped_count += 1;
            AssignmentStatus::AlreadyAssigned
        };
        outcome.assignments.push(GrantAssignment {
            resource_permission_id: binding.id,
            permission_id: binding.permission_id,
            resource_id: binding.resource_id,
            status,
        });
    }
    Ok(outcome)
}

async fn clear_permissions(uow: &dyn UnitOfWork, id: &RoleId) -> AppResult<u64> {
    find_role(uow, id).await?;
    uow.role_permissions().clear(id).await
}
