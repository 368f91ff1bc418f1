//! 访问控制操作
//!
//! 每个操作接收普通数据记录，返回 [`ActionResponse`]。输入字段使用 camelCase，
//! 同时接受 snake_case 别名。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::{PageInfo, UserId};
use storefront_errors::AppResult;

use super::response::{ActionResponse, Done};
use crate::application::authorization::GrantedPermission;
use crate::application::permission::*;
use crate::application::query::*;
use crate::application::resource::*;
use crate::application::role::*;
use crate::application::user_role::*;
use crate::application::{AuthorizationService, EventDispatcher};
use crate::domain::UnitOfWorkFactory;
use crate::domain::rbac::views::{
    PermissionSummary, ResourceSummary, RoleDetail, RolePermissionsView, RoleSummary,
    UserRoleView,
};
use crate::domain::rbac::{PermissionId, RbacQueryRepository, ResourceId, Role, RoleId};
use crate::error::parse_id;
use crate::infrastructure::cache::TaggedCache;

// ---------- 输入 ----------

#[derive(Debug, Clone, Deserialize)]
pub struct NameInput {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameInput {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionResourcesInput {
    #[serde(alias = "permission_id")]
    pub permission_id: String,
    #[serde(alias = "resource_ids")]
    pub resource_ids: Vec<String>,
    #[serde(default, alias = "assigned_by")]
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleInput {
    pub name: String,
    pub priority: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleInput {
    #[serde(alias = "role_id")]
    pub role_id: String,
    pub name: String,
    pub priority: i32,
    #[serde(default, alias = "updated_by")]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoleInput {
    #[serde(alias = "role_id")]
    pub role_id: String,
    #[serde(default, alias = "deleted_by")]
    pub deleted_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionsInput {
    #[serde(alias = "role_id")]
    pub role_id: String,
    #[serde(alias = "permission_ids")]
    pub permission_ids: Vec<String>,
    /// 省略时授予每个权限已绑定的全部资源
    #[serde(default, alias = "resource_ids")]
    pub resource_ids: Option<Vec<String>>,
    #[serde(default, alias = "assigned_by")]
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionsInput {
    #[serde(alias = "role_id")]
    pub role_id: String,
    #[serde(default, alias = "include_resource_details")]
    pub include_resource_details: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleInput {
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(alias = "role_id")]
    pub role_id: String,
    #[serde(default, alias = "expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "assigned_by")]
    pub assigned_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionListFilters {
    #[serde(default)]
    pub resource_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput<F> {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filters: F,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleListFilters {
    #[serde(default)]
    pub priority_min: Option<i32>,
    #[serde(default)]
    pub priority_max: Option<i32>,
    #[serde(default)]
    pub has_users: Option<bool>,
}

// ---------- 输出 ----------

#[derive(Debug, Clone, Serialize)]
pub struct NamedRecord<I> {
    pub id: I,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceData {
    pub data: NamedRecord<ResourceId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionData {
    pub permission: NamedRecord<PermissionId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCreated {
    pub role_id: RoleId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleData {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    pub bindings_removed: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDeleted {
    pub message: String,
    pub deleted_role: NamedRecord<RoleId>,
    pub impact: DeleteImpact,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearedCount {
    pub removed_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Removed {
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceList {
    pub resources: Vec<ResourceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceItem {
    pub resource: ResourceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionPage {
    pub permissions: Vec<PermissionSummary>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolePage {
    pub roles: Vec<RoleSummary>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRoleList {
    pub roles: Vec<UserRoleView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPermissionList {
    pub permissions: Vec<GrantedPermission>,
}

/// 访问控制操作入口
pub struct AccessActions {
    resources: ResourceCommandHandler,
    permissions: PermissionCommandHandler,
    roles: RoleCommandHandler,
    user_roles: UserRoleCommandHandler,
    queries: RbacQueryHandler,
    authorization: AuthorizationService,
}

impl AccessActions {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        query_repo: Arc<dyn RbacQueryRepository>,
        cache: Arc<TaggedCache>,
        default_ttl: Duration,
    ) -> Self {
        let events = Arc::new(EventDispatcher::new(cache.clone()));
        Self {
            resources: ResourceCommandHandler::new(uow_factory.clone(), events.clone()),
            permissions: PermissionCommandHandler::new(uow_factory.clone(), events.clone()),
            roles: RoleCommandHandler::new(uow_factory.clone(), events.clone()),
            user_roles: UserRoleCommandHandler::new(uow_factory, events),
            queries: RbacQueryHandler::new(query_repo.clone(), cache.clone(), default_ttl),
            authorization: AuthorizationService::new(query_repo).with_cache(cache, default_ttl),
        }
    }

    // ----- 资源 -----

    pub async fn create_resource(&self, input: NameInput) -> AppResult<ActionResponse<ResourceData>> {
        let result = self
            .resources
            .handle_create(CreateResourceCommand { name: input.name })
            .await
            .map(|r| ResourceData {
                data: NamedRecord {
                    id: r.id,
                    name: r.name,
                },
            });
        ActionResponse::from_result(result)
    }

    pub async fn update_resource(&self, input: RenameInput) -> AppResult<ActionResponse<ResourceData>> {
        let result = self
            .resources
            .handle_update(UpdateResourceCommand {
                resource_id: input.id,
                name: input.name,
            })
            .await
            .map(|r| ResourceData {
                data: NamedRecord {
                    id: r.id,
                    name: r.name,
                },
            });
        ActionResponse::from_result(result)
    }

    pub async fn delete_resource(&self, resource_id: &str) -> AppResult<ActionResponse<DeletedCount>> {
        let result = self
            .resources
            .handle_delete(DeleteResourceCommand {
                resource_id: resource_id.to_string(),
            })
            .await
            .map(|bindings_removed| DeletedCount { bindings_removed });
        ActionResponse::from_result(result)
    }

    pub async fn get_resources(&self) -> AppResult<ActionResponse<ResourceList>> {
        let result = self
            .queries
            .handle_get_resources()
            .await
            .map(|resources| ResourceList { resources });
        ActionResponse::from_result(result)
    }

    pub async fn get_resource_by_id(&self, resource_id: &str) -> AppResult<ActionResponse<ResourceItem>> {
        let result = self
            .queries
            .handle_get_resource(resource_id)
            .await
            .map(|resource| ResourceItem { resource });
        ActionResponse::from_result(result)
    }

    // ----- 权限 -----

    pub async fn create_permission(&self, input: NameInput) -> AppResult<ActionResponse<PermissionData>> {
        let result = self
            .permissions
            .handle_create(CreatePermissionCommand { name: input.name })
            .await
            .map(|p| PermissionData {
                permission: NamedRecord {
                    id: p.id,
                    name: p.name,
                },
            });
        ActionResponse::from_result(result)
    }

    pub async fn update_permission(&self, input: RenameInput) -> AppResult<ActionResponse<PermissionData>> {
        let result = self
            .permissions
            .handle_update(UpdatePermissionCommand {
                permission_id: input.id,
                name: input.name,
            })
            .await
            .map(|p| PermissionData {
                permission: NamedRecord {
                    id: p.id,
                    name: p.name,
                },
            });
        ActionResponse::from_result(result)
    }

    pub async fn delete_permission(&self, permission_id: &str) -> AppResult<ActionResponse<DeletedCount>> {
        let result = self
            .permissions
            .handle_delete(DeletePermissionCommand {
                permission_id: permission_id.to_string(),
            })
            .await
            .map(|bindings_removed| DeletedCount { bindings_removed });
        ActionResponse::from_result(result)
    }

    pub async fn get_all_permissions_paginated(
        &self,
        input: PageInput<PermissionListFilters>,
    ) -> AppResult<ActionResponse<PermissionPage>> {
        let result = self
            .queries
            .handle_get_permissions(GetPermissionsQuery {
                page: input.page,
                limit: input.limit,
                search: input.search,
                resource_id: input.filters.resource_id,
            })
            .await
            .map(|page| PermissionPage {
                permissions: page.items,
                pagination: page.pagination,
            });
        ActionResponse::from_result(result)
    }

    pub async fn assign_resources_to_permission(
        &self,
        input: PermissionResourcesInput,
    ) -> AppResult<ActionResponse<BindingOutcome>> {
        let result = async {
            let assigned_by = parse_actor(input.assigned_by.as_deref())?;
            self.permissions
                .handle_assign_resources(AssignResourcesToPermissionCommand {
                    permission_id: input.permission_id,
                    resource_ids: input.resource_ids,
                    assigned_by,
                })
                .await
        }
        .await;
        ActionResponse::from_result(result)
    }

    pub async fn remove_resources_from_permission(
        &self,
        input: PermissionResourcesInput,
    ) -> AppResult<ActionResponse<UnbindOutcome>> {
        let result = self
            .permissions
            .handle_remove_resources(RemoveResourcesFromPermissionCommand {
                permission_id: input.permission_id,
                resource_ids: input.resource_ids,
            })
            .await;
        ActionResponse::from_result(result)
    }

    // ----- 角色 -----

    pub async fn create_role(&self, input: CreateRoleInput) -> AppResult<ActionResponse<RoleCreated>> {
        let result = self
            .roles
            .handle_create(CreateRoleCommand {
                name: input.name,
                priority: input.priority,
            })
            .await
            .map(|role| RoleCreated { role_id: role.id });
        ActionResponse::from_result(result)
    }

    pub async fn update_role(&self, input: UpdateRoleInput) -> AppResult<ActionResponse<RoleData>> {
        let result = async {
            let updated_by = parse_actor(input.updated_by.as_deref())?;
            self.roles
                .handle_update(UpdateRoleCommand {
                    role_id: input.role_id,
                    name: input.name,
                    priority: input.priority,
                    updated_by,
                })
                .await
                .map(|role| RoleData { role })
        }
        .await;
        ActionResponse::from_result(result)
    }

    pub async fn delete_role(&self, input: DeleteRoleInput) -> AppResult<ActionResponse<RoleDeleted>> {
        let result = async {
            let deleted_by = parse_actor(input.deleted_by.as_deref())?;
            self.roles
                .handle_delete(DeleteRoleCommand {
                    role_id: input.role_id,
                    deleted_by,
                })
                .await
                .map(|outcome| RoleDeleted {
                    message: format!("Role '{}' deleted successfully", outcome.role.name),
                    deleted_role: NamedRecord {
                        id: outcome.role.id,
                        name: outcome.role.name,
                    },
                    impact: outcome.impact,
                })
        }
        .await;
        ActionResponse::from_result(result)
    }

    pub async fn get_roles_paginated(
        &self,
        input: PageInput<RoleListFilters>,
    ) -> AppResult<ActionResponse<RolePage>> {
        let result = self
            .queries
            .handle_get_roles(GetRolesQuery {
                page: input.page,
                limit: input.limit,
                search: input.search,
                priority_min: input.filters.priority_min,
                priority_max: input.filters.priority_max,
                has_users: input.filters.has_users,
            })
            .await
            .map(|page| RolePage {
                roles: page.items,
                pagination: page.pagination,
            });
        ActionResponse::from_result(result)
    }

    pub async fn get_role_by_id(&self, role_id: &str) -> AppResult<ActionResponse<RoleDetail>> {
        ActionResponse::from_result(self.queries.handle_get_role(role_id).await)
    }

    pub async fn assign_permissions_to_role(
        &self,
        input: AssignPermissionsInput,
    ) -> AppResult<ActionResponse<AssignPermissionsOutcome>> {
        let result = async {
            let assigned_by = parse_actor(input.assigned_by.as_deref())?;
            let scope = GrantScope::from_resource_ids(input.resource_ids)?;
            self.roles
                .handle_assign_permissions(AssignPermissionsToRoleCommand {
                    role_id: input.role_id,
                    permission_ids: input.permission_ids,
                    scope,
                    assigned_by,
                })
                .await
        }
        .await;
        ActionResponse::from_result(result)
    }

    pub async fn clear_role_permissions(&self, role_id: &str) -> AppResult<ActionResponse<ClearedCount>> {
        let result = self
            .roles
            .handle_clear_permissions(ClearRolePermissionsCommand {
                role_id: role_id.to_string(),
            })
            .await
            .map(|removed_count| ClearedCount { removed_count });
        ActionResponse::from_result(result)
    }

    pub async fn get_role_permissions(
        &self,
        input: RolePermissionsInput,
    ) -> AppResult<ActionResponse<RolePermissionsView>> {
        let result = self
            .queries
            .handle_get_role_permissions(GetRolePermissionsQuery {
                role_id: input.role_id,
                include_resource_details: input.include_resource_details,
            })
            .await;
        ActionResponse::from_result(result)
    }

    // ----- 用户角色与授权 -----

    pub async fn assign_role_to_user(&self, input: UserRoleInput) -> AppResult<ActionResponse<Done>> {
        let result = async {
            let assigned_by = parse_actor(input.assigned_by.as_deref())?;
            self.user_roles
                .handle_assign(AssignRoleToUserCommand {
                    user_id: input.user_id,
                    role_id: input.role_id,
                    expires_at: input.expires_at,
                    assigned_by,
                })
                .await
                .map(|_| Done {})
        }
        .await;
        ActionResponse::from_result(result)
    }

    pub async fn remove_role_from_user(&self, user_id: &str, role_id: &str) -> AppResult<ActionResponse<Removed>> {
        let result = self
            .user_roles
            .handle_remove(RemoveRoleFromUserCommand {
                user_id: user_id.to_string(),
                role_id: role_id.to_string(),
            })
            .await
            .map(|removed| Removed { removed });
        ActionResponse::from_result(result)
    }

    pub async fn get_user_roles(&self, user_id: &str) -> AppResult<ActionResponse<UserRoleList>> {
        let result = self
            .queries
            .handle_get_user_roles(user_id)
            .await
            .map(|roles| UserRoleList { roles });
        ActionResponse::from_result(result)
    }

    pub async fn get_user_permissions(&self, user_id: &str) -> AppResult<ActionResponse<UserPermissionList>> {
        let result = async {
            let user_id: UserId = parse_id(user_id, "user")?;
            self.authorization
                .user_permissions(&user_id)
                .await
                .map(|permissions| UserPermissionList { permissions })
        }
        .await;
        ActionResponse::from_result(result)
    }

    /// 授权检查，错误原样返回
    pub async fn check(&self, user_id: &UserId, action: &str, resource: &str) -> AppResult<bool> {
        self.authorization.check(user_id, action, resource).await
    }

    /// 授权检查，无用户或出错时返回 false
    pub async fn has_permission(&self, user_id: Option<&UserId>, action: &str, resource: &str) -> bool {
        self.authorization.has_permission(user_id, action, resource).await
    }
}

fn parse_actor(raw: Option<&str>) -> AppResult<Option<UserId>> {
    Ok(raw.map(|value| parse_id(value, "user")).transpose()?)
}
