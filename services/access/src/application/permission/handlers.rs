//! 权限命令处理器

use std::collections::BTreeSet;
use std::sync::Arc;

use storefront_common::UserId;
use storefront_errors::{AppError, AppResult};
use tracing::info;

use super::commands::*;
use crate::application::events::EventDispatcher;
use crate::application::transaction::complete;
use crate::domain::rbac::{
    BindingScope, Permission, PermissionId, RbacEvent, ResourceId, ResourcePermission,
    normalize_name,
};
use crate::domain::{UnitOfWork, UnitOfWorkFactory};
use crate::error::{AccessError, parse_id};

/// 权限命令处理器
pub struct PermissionCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    events: Arc<EventDispatcher>,
}

impl PermissionCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, events: Arc<EventDispatcher>) -> Self {
        Self {
            uow_factory,
            events,
        }
    }

    /// 创建权限
    pub async fn handle_create(&self, cmd: CreatePermissionCommand) -> AppResult<Permission> {
        let permission = Permission::new(&cmd.name)?;

        let uow = self.uow_factory.begin().await?;
        let result = create(uow.as_ref(), &permission).await;
        complete(uow, result).await?;

        info!(permission_id = %permission.id, name = %permission.name, "Permission created");
        self.events
            .dispatch(&[RbacEvent::PermissionCreated {
                permission_id: permission.id,
                name: permission.name.clone(),
            }])
            .await;

        Ok(permission)
    }

    /// 重命名权限
    pub async fn handle_update(&self, cmd: UpdatePermissionCommand) -> AppResult<Permission> {
        let permission_id: PermissionId = parse_id(&cmd.permission_id, "permission")?;
        let name = normalize_name("Permission", &cmd.name)?;

        let uow = self.uow_factory.begin().await?;
        let result = update(uow.as_ref(), &permission_id, &name).await;
        let permission = complete(uow, result).await?;

        info!(permission_id = %permission.id, name = %permission.name, "Permission updated");
        self.events
            .dispatch(&[RbacEvent::PermissionUpdated {
                permission_id: permission.id,
                name: permission.name.clone(),
            }])
            .await;

        Ok(permission)
    }

    /// 删除权限，规则与删除资源相同
    pub async fn handle_delete(&self, cmd: DeletePermissionCommand) -> AppResult<u64> {
        let permission_id: PermissionId = parse_id(&cmd.permission_id, "permission")?;

        let uow = self.uow_factory.begin().await?;
        let result = delete(uow.as_ref(), &permission_id).await;
        let bindings_removed = complete(uow, result).await?;

        info!(permission_id = %permission_id, bindings_removed, "Permission deleted");
        self.events
            .dispatch(&[RbacEvent::PermissionDeleted {
                permission_id,
                bindings_removed,
            }])
            .await;

        Ok(bindings_removed)
    }

    /// 绑定资源，已存在的绑定直接复用
    pub async fn handle_assign_resources(
        &self,
        cmd: AssignResourcesToPermissionCommand,
    ) -> AppResult<BindingOutcome> {
        let permission_id: PermissionId = parse_id(&cmd.permission_id, "permission")?;
        let resource_ids = parse_resource_ids(&cmd.resource_ids)?;

        let uow = self.uow_factory.begin().await?;
        let result =
            assign_resources(uow.as_ref(), &permission_id, &resource_ids, cmd.assigned_by).await;
        let outcome = complete(uow, result).await?;

        info!(
            permission_id = %permission_id,
            created = outcome.created,
            existing = outcome.existing,
            "Resources bound to permission"
        );
        if outcome.created > 0 {
            self.events
                .dispatch(&[RbacEvent::PermissionResourcesAssigned {
                    permission_id,
                    resource_ids,
                    created: outcome.created,
                    by: cmd.assigned_by,
                }])
                .await;
        }

        Ok(outcome)
    }

    /// 解除资源绑定，同时撤销引用这些绑定的角色授予
    pub async fn handle_remove_resources(
        &self,
        cmd: RemoveResourcesFromPermissionCommand,
    ) -> AppResult<UnbindOutcome> {
        let permission_id: PermissionId = parse_id(&cmd.permission_id, "permission")?;
        let resource_ids = parse_resource_ids(&cmd.resource_ids)?;

        let uow = self.uow_factory.begin().await?;
        let result = remove_resources(uow.as_ref(), &permission_id, &resource_ids).await;
        let outcome = complete(uow, result).await?;

        info!(
            permission_id = %permission_id,
            removed = outcome.removed,
            grants_revoked = outcome.grants_revoked,
            "Resources unbound from permission"
        );
        if outcome.removed > 0 {
            self.events
                .dispatch(&[RbacEvent::PermissionResourcesRemoved {
                    permission_id,
                    resource_ids,
                    grants_revoked: outcome.grants_revoked,
                }])
                .await;
        }

        Ok(outcome)
    }
}

/// 解析并去重资源 ID，保持输入顺序
pub(crate) fn parse_resource_ids(raw: &[String]) -> Result<Vec<ResourceId>, AccessError> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id: ResourceId = parse_id(value, "resource")?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// 确认所有资源都存在
pub(crate) async fn ensure_resources_exist(
    uow: &dyn UnitOfWork,
    ids: &[ResourceId],
) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = uow.resources().find_by_ids(ids).await?;
    if found.len() != ids.len() {
        return Err(AccessError::ResourceNotFound.into());
    }
    Ok(())
}

/// 查找绑定，不存在时创建；返回绑定和是否新建
pub(crate) async fn find_or_create_binding(
    uow: &dyn UnitOfWork,
    resource_id: &ResourceId,
    permission_id: &PermissionId,
    assigned_by: Option<UserId>,
) -> AppResult<(ResourcePermission, bool)> {
    if let Some(binding) = uow
        .resource_permissions()
        .find(resource_id, permission_id)
        .await?
    {
        return Ok((binding, false));
    }

    let binding = ResourcePermission::new(*resource_id, *permission_id, assigned_by);
    if uow.resource_permissions().insert_if_absent(&binding).await? {
        return Ok((binding, true));
    }

    // 并发事务先插入了同一绑定
    let existing = uow
        .resource_permissions()
        .find(resource_id, permission_id)
        .await?
        .ok_or_else(|| AppError::conflict("Binding was removed concurrently"))?;
    Ok((existing, false))
}

async fn create(uow: &dyn UnitOfWork, permission: &Permission) -> AppResult<()> {
    if uow.permissions().exists_by_name(&permission.name, None).await? {
        return Err(AccessError::PermissionAlreadyExists(permission.name.clone()).into());
    }
    uow.permissions().create(permission).await
}

async fn update(uow: &dyn UnitOfWork, id: &PermissionId, name: &str) -> AppResult<Permission> {
    let mut permission = uow
        .permissions()
        .find_by_id(id)
        .await?
        .ok_or(AccessError::PermissionNotFound)?;

    if uow.permissions().exists_by_name(name, Some(id)).await? {
        return Err(AccessError::PermissionAlreadyExists(name.to_string()).into());
    }

    permission.rename(name)?;
    uow.permissions().update(&permission).await?;
    Ok(permission)
}

async fn delete(uow: &dyn UnitOfWork, id: &PermissionId) -> AppResult<u64> {
    uow.permissions()
        .find_by_id(id)
        .await?
        .ok_or(AccessError::PermissionNotFound)?;

    let scope = BindingScope::Permission(*id);
    if uow.resource_permissions().count_granted(scope).await? > 0 {
        return Err(AccessError::StillReferenced("permission").into());
    }

    let removed = uow.resource_permissions().delete_by_scope(scope).await?;
    uow.permissions().delete(id).await?;
    Ok(removed)
}

async fn assign_resources(
    uow: &dyn UnitOfWork,
    permission_id: &PermissionId,
    resource_ids: &[ResourceId],
    assigned_by: Option<UserId>,
) -> AppResult<BindingOutcome> {
    uow.permissions()
        .find_by_id(permission_id)
        .await?
        .ok_or(AccessError::PermissionNotFound)?;
    ensure_resources_exist(uow, resource_ids).await?;

    let mut outcome = BindingOutcome::default();
    for resource_id in resource_ids {
        let (_, created) =
            find_or_create_binding(uow, resource_id, permission_id, assigned_by).await?;
        if created {
            outcome.created += 1;
        } else {
            outcome.existing += 1;
        }
    }
    Ok(outcome)
}

async fn remove_resources(
    uow: &dyn UnitOfWork,
    permission_id: &PermissionId,
    resource_ids: &[ResourceId],
) -> AppResult<UnbindOutcome> {
    uow.permissions()
        .find_by_id(permission_id)
        .await?
        .ok_or(AccessError::PermissionNotFound)?;

    let mut outcome = UnbindOutcome::default();
    for resource_id in resource_ids {
        let Some(binding) = uow
            .resource_permissions()
            .find(resource_id, permission_id)
            .await?
        else {
            continue;
        };
        outcome.grants_revoked += uow.role_permissions().revoke_binding(&binding.id).await?;
        uow.resource_permissions().delete(&binding.id).await?;
        outcome.removed += 1;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_ids_dedupes() {
        let id = ResourceId::new();
        let ids = parse_resource_ids(&[id.to_string(), id.to_string()]).unwrap();
        assert_eq!(ids, vec![id]);
    }

    #[test]
    fn test_parse_resource_ids_rejects_garbage() {
        assert_eq!(
            parse_resource_ids(&["x".to_string()]),
            Err(AccessError::InvalidId("resource"))
        );
    }
}
