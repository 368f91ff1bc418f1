//! 资源命令处理器

use std::sync::Arc;

use storefront_errors::AppResult;
use tracing::info;

use super::commands::*;
use crate::application::events::EventDispatcher;
use crate::application::transaction::complete;
use crate::domain::rbac::{BindingScope, RbacEvent, Resource, ResourceId, normalize_name};
use crate::domain::{UnitOfWork, UnitOfWorkFactory};
use crate::error::{AccessError, parse_id};

/// 资源命令处理器
pub struct ResourceCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    events: Arc<EventDispatcher>,
}

impl ResourceCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, events: Arc<EventDispatcher>) -> Self {
        Self {
            uow_factory,
            events,
        }
    }

    /// 创建资源
    pub async fn handle_create(&self, cmd: CreateResourceCommand) -> AppResult<Resource> {
        let resource = Resource::new(&cmd.name)?;

        let uow = self.uow_factory.begin().await?;
        let result = create(uow.as_ref(), &resource).await;
        complete(uow, result).await?;

        info!(resource_id = %resource.id, name = %resource.name, "Resource created");
        self.events
            .dispatch(&[RbacEvent::ResourceCreated {
                resource_id: resource.id,
                name: resource.name.clone(),
            }])
            .await;

        Ok(resource)
    }

    /// 重命名资源
    pub async fn handle_update(&self, cmd: UpdateResourceCommand) -> AppResult<Resource> {
        let resource_id: ResourceId = parse_id(&cmd.resource_id, "resource")?;
        let name = normalize_name("Resource", &cmd.name)?;

        let uow = self.uow_factory.begin().await?;
        let result = update(uow.as_ref(), &resource_id, &name).await;
        let resource = complete(uow, result).await?;

        info!(resource_id = %resource.id, name = %resource.name, "Resource updated");
        self.events
            .dispatch(&[RbacEvent::ResourceUpdated {
                resource_id: resource.id,
                name: resource.name.clone(),
            }])
            .await;

        Ok(resource)
    }

    /// 删除资源
    ///
    /// 未被任何角色授予引用的绑定随资源一起删除；仍被引用时拒绝。
    pub async fn handle_delete(&self, cmd: DeleteResourceCommand) -> AppResult<u64> {
        let resource_id: ResourceId = parse_id(&cmd.resource_id, "resource")?;

        let uow = self.uow_factory.begin().await?;
        let result = delete(uow.as_ref(), &resource_id).await;
        let bindings_removed = complete(uow, result).await?;

        info!(resource_id = %resource_id, bindings_removed, "Resource deleted");
        self.events
            .dispatch(&[RbacEvent::ResourceDeleted {
                resource_id,
                bindings_removed,
            }])
            .await;

        Ok(bindings_removed)
    }
}

async fn create(uow: &dyn UnitOfWork, resource: &Resource) -> AppResult<()> {
    if uow.resources().exists_by_name(&resource.name, None).await? {
        return Err(AccessError::ResourceAlreadyExists(resource.name.clone()).into());
    }
    uow.resources().create(resource).await
}

async fn update(uow: &dyn UnitOfWork, id: &ResourceId, name: &str) -> AppResult<Resource> {
    let mut resource = uow
        .resources()
        .find_by_id(id)
        .await?
        .ok_or(AccessError::ResourceNotFound)?;

    if uow.resources().exists_by_name(name, Some(id)).await? {
        return Err(AccessError::ResourceAlreadyExists(name.to_string()).into());
    }

    resource.rename(name)?;
    uow.resources().update(&resource).await?;
    Ok(resource)
}

async fn delete(uow: &dyn UnitOfWork, id: &ResourceId) -> AppResult<u64> {
    uow.resources()
        .find_by_id(id)
        .await?
        .ok_or(AccessError::ResourceNotFound)?;

    let scope = BindingScope::Resource(*id);
    if uow.resource_permissions().count_granted(scope).await? > 0 {
        return Err(AccessError::StillReferenced("resource").into());
    }

    let removed = uow.resource_permissions().delete_by_scope(scope).await?;
    uow.resources().delete(id).await?;
    Ok(removed)
}
