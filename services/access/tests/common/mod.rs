//! 集成测试共用的内存存储
//!
//! 写侧通过快照实现 Unit of Work：`begin` 复制当前状态，`commit` 整体替换，
//! `rollback` 直接丢弃。读侧查询直接读取已提交状态。

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storefront_access::AccessActions;
use storefront_access::domain::rbac::views::*;
use storefront_access::domain::rbac::*;
use storefront_access::domain::{UnitOfWork, UnitOfWorkFactory};
use storefront_access::infrastructure::cache::{MokaCache, TaggedCache};
use storefront_common::{PagedResult, Pagination, UserId};
use storefront_errors::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct State {
    pub resources: BTreeMap<ResourceId, Resource>,
    pub permissions: BTreeMap<PermissionId, Permission>,
    pub bindings: BTreeMap<ResourcePermissionId, ResourcePermission>,
    pub roles: BTreeMap<RoleId, Role>,
    pub grants: BTreeMap<RolePermissionId, RolePermission>,
    pub user_roles: Vec<UserRole>,
}

impl State {
    fn binding(&self, id: &ResourcePermissionId) -> Option<&ResourcePermission> {
        self.bindings.get(id)
    }

    fn active_user_roles(&self, now: DateTime<Utc>) -> impl Iterator<Item = &UserRole> {
        self.user_roles.iter().filter(move |ur| ur.is_active_at(now))
    }

    fn role_grants(&self, role_id: &RoleId) -> Vec<RoleGrant> {
        let mut grants: Vec<RoleGrant> = self
            .grants
            .values()
            .filter(|g| g.role_id == *role_id)
            .filter_map(|g| {
                let binding = self.binding(&g.resource_permission_id)?;
                let permission = self.permissions.get(&binding.permission_id)?;
                let resource = self.resources.get(&binding.resource_id)?;
                Some(RoleGrant {
                    resource_permission_id: binding.id,
                    permission_id: permission.id,
                    permission_name: permission.name.clone(),
                    resource_id: resource.id,
                    resource_name: resource.name.clone(),
                    granted_at: g.granted_at,
                })
            })
            .collect();
        grants.sort_by(|a, b| {
            (&a.permission_name, &a.resource_name).cmp(&(&b.permission_name, &b.resource_name))
        });
        grants
    }

    fn role_users(&self, role_id: &RoleId, now: DateTime<Utc>) -> Vec<RoleUser> {
        let mut users: Vec<RoleUser> = self
            .active_user_roles(now)
            .filter(|ur| ur.role_id == *role_id)
            .map(|ur| RoleUser {
                user_id: ur.user_id,
                assigned_at: ur.assigned_at,
                assigned_by: ur.assigned_by,
                expires_at: ur.expires_at,
            })
            .collect();
        users.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        users
    }

    fn role_view(role: &Role) -> RoleView {
        RoleView {
            id: role.id,
            name: role.name.clone(),
            priority: role.priority,
            tier: role.priority.tier(),
            created_at: role.audit_info.created_at,
            updated_at: role.audit_info.updated_at,
        }
    }
}

fn page<T: Clone>(items: &[T], pagination: &Pagination) -> PagedResult<T> {
    let start = usize::try_from(pagination.offset())
        .unwrap_or(usize::MAX)
        .min(items.len());
    let end = (start + pagination.limit as usize).min(items.len());
    PagedResult::new(items[start..end].to_vec(), items.len() as u64, pagination)
}

/// 每个权限取第一条授予，最多 SAMPLE_SIZE 条
fn distinct_permissions(grants: Vec<RoleGrant>) -> Vec<RoleGrant> {
    let mut seen = BTreeSet::new();
    grants
        .into_iter()
        .filter(|g| seen.insert(g.permission_id))
        .take(SAMPLE_SIZE as usize)
        .collect()
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
}

struct Shared {
    state: Mutex<State>,
    grant_calls: AtomicUsize,
    fail_on_grant: AtomicUsize,
    /// 下一次关联表插入前，模拟另一事务已提交同一行
    race_next_insert: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// 内存存储，同时充当 Unit of Work 工厂与读侧查询
#[derive(Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                grant_calls: AtomicUsize::new(0),
                fail_on_grant: AtomicUsize::new(0),
                race_next_insert: AtomicBool::new(false),
                commits: AtomicUsize::new(0),
                rollbacks: AtomicUsize::new(0),
            }),
        }
    }

    fn committed(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap()
    }

    pub fn snapshot(&self) -> State {
        self.committed().clone()
    }

    /// 第 `n` 次写入角色授予时返回数据库错误 (从 1 开始计数)
    pub fn fail_on_grant(&self, n: usize) {
        self.shared.grant_calls.store(0, Ordering::SeqCst);
        self.shared.fail_on_grant.store(n, Ordering::SeqCst);
    }

    /// 下一次插入绑定或授予时，同一行已由并发事务提交
    pub fn race_next_insert(&self) {
        self.shared.race_next_insert.store(true, Ordering::SeqCst);
    }

    /// 直接写入一条用户角色，用于构造已过期的授予
    pub fn insert_user_role(&self, grant: UserRole) {
        let mut state = self.committed();
        state
            .user_roles
            .retain(|ur| !(ur.user_id == grant.user_id && ur.role_id == grant.role_id));
        state.user_roles.push(grant);
    }

    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let working = self.snapshot();
        Ok(Box::new(InMemoryUnitOfWork {
            shared: self.shared.clone(),
            working: Mutex::new(working),
        }))
    }
}

pub struct InMemoryUnitOfWork {
    shared: Arc<Shared>,
    working: Mutex<State>,
}

impl InMemoryUnitOfWork {
    fn state(&self) -> MutexGuard<'_, State> {
        self.working.lock().unwrap()
    }

    fn racing(&self) -> bool {
        self.shared.race_next_insert.swap(false, Ordering::SeqCst)
    }
}

fn duplicate() -> AppError {
    AppError::conflict("Duplicate entry violates unique constraint")
}

fn referenced() -> AppError {
    AppError::conflict("Cannot delete record: it is referenced by other records")
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn resources(&self) -> &dyn ResourceRepository {
        self
    }

    fn permissions(&self) -> &dyn PermissionRepository {
        self
    }

    fn resource_permissions(&self) -> &dyn ResourcePermissionRepository {
        self
    }

    fn roles(&self) -> &dyn RoleRepository {
        self
    }

    fn role_permissions(&self) -> &dyn RolePermissionRepository {
        self
    }

    fn user_roles(&self) -> &dyn UserRoleRepository {
        self
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let this = *self;
        let working = this.working.into_inner().unwrap();
        *this.shared.state.lock().unwrap() = working;
        this.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ResourceRepository for InMemoryUnitOfWork {
    async fn create(&self, resource: &Resource) -> AppResult<()> {
        let mut state = self.state();
        if state.resources.values().any(|r| r.name == resource.name) {
            return Err(duplicate());
        }
        state.resources.insert(resource.id, resource.clone());
        Ok(())
    }

    async fn update(&self, resource: &Resource) -> AppResult<()> {
        self.state().resources.insert(resource.id, resource.clone());
        Ok(())
    }

    async fn delete(&self, id: &ResourceId) -> AppResult<()> {
        let mut state = self.state();
        if state.bindings.values().any(|b| b.resource_id == *id) {
            return Err(referenced());
        }
        state.resources.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &ResourceId) -> AppResult<Option<Resource>> {
        Ok(self.state().resources.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[ResourceId]) -> AppResult<Vec<Resource>> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.resources.get(id).cloned()).collect())
    }

    async fn exists_by_name(&self, name: &str, exclude: Option<&ResourceId>) -> AppResult<bool> {
        Ok(self
            .state()
            .resources
            .values()
            .any(|r| r.name == name && Some(&r.id) != exclude))
    }
}

#[async_trait]
impl PermissionRepository for InMemoryUnitOfWork {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        let mut state = self.state();
        if state.permissions.values().any(|p| p.name == permission.name) {
            return Err(duplicate());
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        self.state()
            .permissions
            .insert(permission.id, permission.clone());
        Ok(())
    }

    async fn delete(&self, id: &PermissionId) -> AppResult<()> {
        let mut state = self.state();
        if state.bindings.values().any(|b| b.permission_id == *id) {
            return Err(referenced());
        }
        state.permissions.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state().permissions.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.permissions.get(id).cloned())
            .collect())
    }

    async fn exists_by_name(
        &self,
        name: &str,
        exclude: Option<&PermissionId>,
    ) -> AppResult<bool> {
        Ok(self
            .state()
            .permissions
            .values()
            .any(|p| p.name == name && Some(&p.id) != exclude))
    }
}

fn in_scope(binding: &ResourcePermission, scope: BindingScope) -> bool {
    match scope {
        BindingScope::Resource(id) => binding.resource_id == id,
        BindingScope::Permission(id) => binding.permission_id == id,
    }
}

#[async_trait]
impl ResourcePermissionRepository for InMemoryUnitOfWork {
    async fn find(
        &self,
        resource_id: &ResourceId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<ResourcePermission>> {
        Ok(self
            .state()
            .bindings
            .values()
            .find(|b| b.binds(resource_id, permission_id))
            .cloned())
    }

    async fn insert_if_absent(&self, binding: &ResourcePermission) -> AppResult<bool> {
        let mut state = self.state();
        if self.racing() {
            let winner = ResourcePermission::new(binding.resource_id, binding.permission_id, None);
            state.bindings.insert(winner.id, winner);
        }
        if state
            .bindings
            .values()
            .any(|b| b.binds(&binding.resource_id, &binding.permission_id))
        {
            return Ok(false);
        }
        state.bindings.insert(binding.id, binding.clone());
        Ok(true)
    }

    async fn list_by_permission(
        &self,
        permission_id: &PermissionId,
    ) -> AppResult<Vec<ResourcePermission>> {
        Ok(self
            .state()
            .bindings
            .values()
            .filter(|b| b.permission_id == *permission_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &ResourcePermissionId) -> AppResult<()> {
        let mut state = self.state();
        if state.grants.values().any(|g| g.resource_permission_id == *id) {
            return Err(referenced());
        }
        state.bindings.remove(id);
        Ok(())
    }

    async fn count_granted(&self, scope: BindingScope) -> AppResult<u64> {
        let state = self.state();
        Ok(state
            .grants
            .values()
            .filter(|g| {
                state
                    .binding(&g.resource_permission_id)
                    .is_some_and(|b| in_scope(b, scope))
            })
            .count() as u64)
    }

    async fn delete_by_scope(&self, scope: BindingScope) -> AppResult<u64> {
        let mut state = self.state();
        let doomed: BTreeSet<ResourcePermissionId> = state
            .bindings
            .values()
            .filter(|b| in_scope(b, scope))
            .map(|b| b.id)
            .collect();
        if state
            .grants
            .values()
            .any(|g| doomed.contains(&g.resource_permission_id))
        {
            return Err(referenced());
        }
        state.bindings.retain(|id, _| !doomed.contains(id));
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl RoleRepository for InMemoryUnitOfWork {
    async fn create(&self, role: &Role) -> AppResult<()> {
        let mut state = self.state();
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(duplicate());
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        self.state().roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete(&self, id: &RoleId) -> AppResult<()> {
        let mut state = self.state();
        let referenced_by_grants = state.grants.values().any(|g| g.role_id == *id);
        let referenced_by_users = state.user_roles.iter().any(|ur| ur.role_id == *id);
        if referenced_by_grants || referenced_by_users {
            return Err(referenced());
        }
        state.roles.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>> {
        Ok(self.state().roles.get(id).cloned())
    }

    async fn exists_by_name(&self, name: &str, exclude: Option<&RoleId>) -> AppResult<bool> {
        Ok(self
            .state()
            .roles
            .values()
            .any(|r| r.name == name && Some(&r.id) != exclude))
    }
}

#[async_trait]
impl RolePermissionRepository for InMemoryUnitOfWork {
    async fn grant(&self, grant: &RolePermission) -> AppResult<bool> {
        let call = self.shared.grant_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.shared.fail_on_grant.load(Ordering::SeqCst) {
            return Err(AppError::database("injected failure"));
        }

        let mut state = self.state();
        if self.racing() {
            let winner = RolePermission::new(grant.role_id, grant.resource_permission_id, None);
            state.grants.insert(winner.id, winner);
        }
        if state.grants.values().any(|g| {
            g.role_id == grant.role_id && g.resource_permission_id == grant.resource_permission_id
        }) {
            return Ok(false);
        }
        state.grants.insert(grant.id, grant.clone());
        Ok(true)
    }

    async fn clear(&self, role_id: &RoleId) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.grants.len();
        state.grants.retain(|_, g| g.role_id != *role_id);
        Ok((before - state.grants.len()) as u64)
    }

    async fn revoke_binding(&self, binding_id: &ResourcePermissionId) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.grants.len();
        state
            .grants
            .retain(|_, g| g.resource_permission_id != *binding_id);
        Ok((before - state.grants.len()) as u64)
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryUnitOfWork {
    async fn upsert(&self, grant: &UserRole) -> AppResult<()> {
        let mut state = self.state();
        state
            .user_roles
            .retain(|ur| !(ur.user_id == grant.user_id && ur.role_id == grant.role_id));
        state.user_roles.push(grant.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.user_roles.len();
        state
            .user_roles
            .retain(|ur| !(ur.user_id == *user_id && ur.role_id == *role_id));
        Ok((before - state.user_roles.len()) as u64)
    }

    async fn delete_by_role(&self, role_id: &RoleId) -> AppResult<u64> {
        let mut state = self.state();
        let before = state.user_roles.len();
        state.user_roles.retain(|ur| ur.role_id != *role_id);
        Ok((before - state.user_roles.len()) as u64)
    }

    async fn count_active_by_role(&self, role_id: &RoleId) -> AppResult<u64> {
        let state = self.state();
        Ok(state
            .active_user_roles(Utc::now())
            .filter(|ur| ur.role_id == *role_id)
            .count() as u64)
    }

    async fn highest_priority(&self, user_id: &UserId) -> AppResult<Option<RolePriority>> {
        let state = self.state();
        Ok(state
            .active_user_roles(Utc::now())
            .filter(|ur| ur.user_id == *user_id)
            .filter_map(|ur| state.roles.get(&ur.role_id))
            .map(|r| r.priority)
            .min())
    }
}

#[async_trait]
impl RbacQueryRepository for InMemoryStore {
    async fn list_resources(&self) -> AppResult<Vec<ResourceSummary>> {
        let state = self.committed();
        let mut resources: Vec<ResourceSummary> = state
            .resources
            .values()
            .map(|r| ResourceSummary {
                id: r.id,
                name: r.name.clone(),
                permission_count: state
                    .bindings
                    .values()
                    .filter(|b| b.resource_id == r.id)
                    .count() as u64,
                created_at: r.audit_info.created_at,
                updated_at: r.audit_info.updated_at,
            })
            .collect();
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(resources)
    }

    async fn find_resource(&self, id: &ResourceId) -> AppResult<Option<ResourceSummary>> {
        Ok(self
            .list_resources()
            .await?
            .into_iter()
            .find(|r| r.id == *id))
    }

    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<PermissionSummary>> {
        let state = self.committed();
        let mut items: Vec<PermissionSummary> = state
            .permissions
            .values()
            .filter(|p| contains_ci(&p.name, filter.search_term()))
            .filter(|p| {
                filter.resource_id.is_none_or(|rid| {
                    state
                        .bindings
                        .values()
                        .any(|b| b.permission_id == p.id && b.resource_id == rid)
                })
            })
            .map(|p| {
                let bound: Vec<&ResourcePermission> = state
                    .bindings
                    .values()
                    .filter(|b| b.permission_id == p.id)
                    .collect();
                let mut resources: Vec<ResourceRef> = bound
                    .iter()
                    .filter_map(|b| state.resources.get(&b.resource_id))
                    .map(|r| ResourceRef {
                        id: r.id,
                        name: r.name.clone(),
                    })
                    .collect();
                resources.sort_by(|a, b| a.name.cmp(&b.name));

                let role_ids: BTreeSet<RoleId> = state
                    .grants
                    .values()
                    .filter(|g| bound.iter().any(|b| b.id == g.resource_permission_id))
                    .map(|g| g.role_id)
                    .collect();
                let mut roles: Vec<RoleRef> = role_ids
                    .iter()
                    .filter_map(|id| state.roles.get(id))
                    .map(|r| RoleRef {
                        id: r.id,
                        name: r.name.clone(),
                        priority: r.priority,
                    })
                    .collect();
                roles.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));

                PermissionSummary {
                    id: p.id,
                    name: p.name.clone(),
                    resource_count: resources.len() as u64,
                    role_count: roles.len() as u64,
                    resources,
                    roles,
                    created_at: p.audit_info.created_at,
                    updated_at: p.audit_info.updated_at,
                }
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(page(&items, pagination))
    }

    async fn list_roles(
        &self,
        filter: &RoleFilter,
        pagination: &Pagination,
    ) -> AppResult<PagedResult<RoleSummary>> {
        let state = self.committed();
        let now = Utc::now();
        let mut items: Vec<RoleSummary> = state
            .roles
            .values()
            .filter(|r| contains_ci(&r.name, filter.search_term()))
            .filter(|r| filter.priority_min.is_none_or(|min| r.priority.value() >= min))
            .filter(|r| filter.priority_max.is_none_or(|max| r.priority.value() <= max))
            .filter_map(|r| {
                let grants = state.role_grants(&r.id);
                let users = state.role_users(&r.id, now);
                if filter.has_users.is_some_and(|want| want == users.is_empty()) {
                    return None;
                }
                let summary = summarize_grants(&grants);
                Some(RoleSummary {
                    id: r.id,
                    name: r.name.clone(),
                    priority: r.priority,
                    tier: r.priority.tier(),
                    permission_count: summary.total_permissions,
                    resource_count: summary.total_resources,
                    user_count: users.len() as u64,
                    sample_permissions: distinct_permissions(grants),
                    sample_users: users.into_iter().take(SAMPLE_SIZE as usize).collect(),
                    created_at: r.audit_info.created_at,
                    updated_at: r.audit_info.updated_at,
                })
            })
            .collect();
        items.sort_by(|a, b| (a.priority, &a.name).cmp(&(b.priority, &b.name)));
        Ok(page(&items, pagination))
    }

    async fn find_role(&self, id: &RoleId) -> AppResult<Option<RoleView>> {
        Ok(self.committed().roles.get(id).map(State::role_view))
    }

    async fn role_grants(&self, id: &RoleId) -> AppResult<Vec<RoleGrant>> {
        Ok(self.committed().role_grants(id))
    }

    async fn role_users(&self, id: &RoleId) -> AppResult<Vec<RoleUser>> {
        Ok(self.committed().role_users(id, Utc::now()))
    }

    async fn user_roles(&self, user_id: &UserId) -> AppResult<Vec<UserRoleView>> {
        let state = self.committed();
        let mut roles: Vec<UserRoleView> = state
            .active_user_roles(Utc::now())
            .filter(|ur| ur.user_id == *user_id)
            .filter_map(|ur| {
                let role = state.roles.get(&ur.role_id)?;
                Some(UserRoleView {
                    role_id: role.id,
                    role_name: role.name.clone(),
                    priority: role.priority,
                    assigned_at: ur.assigned_at,
                    assigned_by: ur.assigned_by,
                    expires_at: ur.expires_at,
                })
            })
            .collect();
        roles.sort_by(|a, b| (a.priority, &a.role_name).cmp(&(b.priority, &b.role_name)));
        Ok(roles)
    }

    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<ActiveGrant>> {
        let state = self.committed();
        let mut grants = Vec::new();
        for ur in state
            .active_user_roles(Utc::now())
            .filter(|ur| ur.user_id == *user_id)
        {
            for grant in state.role_grants(&ur.role_id) {
                let entry = ActiveGrant {
                    resource: grant.resource_name,
                    action: grant.permission_name,
                    expires_at: ur.expires_at,
                };
                if !grants.contains(&entry) {
                    grants.push(entry);
                }
            }
        }
        Ok(grants)
    }

    async fn next_grant_expiry(&self) -> AppResult<Option<DateTime<Utc>>> {
        let now = Utc::now();
        Ok(self
            .committed()
            .user_roles
            .iter()
            .filter_map(|ur| ur.expires_at)
            .filter(|at| *at > now)
            .min())
    }
}

/// 基于内存存储装配全部操作
pub fn actions(store: &InMemoryStore) -> AccessActions {
    let cache = Arc::new(TaggedCache::new(Arc::new(MokaCache::new(
        1_000,
        Duration::from_secs(60),
    ))));
    AccessActions::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        cache,
        Duration::from_secs(60),
    )
}

/// 常用测试场景：products 资源 + read/write 权限
pub struct Catalog {
    pub products: ResourceId,
    pub orders: ResourceId,
    pub read: PermissionId,
    pub write: PermissionId,
}

pub async fn seed_catalog(actions: &AccessActions) -> Catalog {
    use storefront_access::api::PermissionResourcesInput;

    let products = create_resource(actions, "products").await;
    let orders = create_resource(actions, "orders").await;
    let read = create_permission(actions, "read").await;
    let write = create_permission(actions, "write").await;

    for permission in [read, write] {
        let bound = actions
            .assign_resources_to_permission(PermissionResourcesInput {
                permission_id: permission.to_string(),
                resource_ids: vec![products.to_string(), orders.to_string()],
                assigned_by: None,
            })
            .await
            .unwrap();
        assert!(bound.success);
    }

    Catalog {
        products,
        orders,
        read,
        write,
    }
}

pub async fn create_resource(actions: &AccessActions, name: &str) -> ResourceId {
    let response = actions
        .create_resource(storefront_access::api::NameInput { name: name.into() })
        .await
        .unwrap();
    response.into_data().unwrap().data.id
}

pub async fn create_permission(actions: &AccessActions, name: &str) -> PermissionId {
    let response = actions
        .create_permission(storefront_access::api::NameInput { name: name.into() })
        .await
        .unwrap();
    response.into_data().unwrap().permission.id
}

pub async fn create_role(actions: &AccessActions, name: &str, priority: i32) -> RoleId {
    let response = actions
        .create_role(storefront_access::api::CreateRoleInput {
            name: name.into(),
            priority,
        })
        .await
        .unwrap();
    response.into_data().unwrap().role_id
}
