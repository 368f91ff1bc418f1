//! 事务内仓储实现
//!
//! 这些仓储共享同一个事务，而不是直接使用连接池。

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use storefront_common::UserId;
use storefront_errors::{AppError, AppResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error_mapper::map_sqlx_error;
use super::rows::{PermissionRow, ResourcePermissionRow, ResourceRow, RoleRow, priority_from_db};
use crate::domain::rbac::{
    BindingScope, Permission, PermissionId, PermissionRepository, Resource, ResourceId,
    ResourcePermission, ResourcePermissionId, ResourcePermissionRepository, ResourceRepository,
    Role, RoleId, RolePermission, RolePermissionRepository, RolePriority, RoleRepository,
    UserRole, UserRoleRepository,
};

/// 共享事务类型
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 定义事务仓储结构
macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxResourceRepository);
define_tx_repo!(TxPermissionRepository);
define_tx_repo!(TxResourcePermissionRepository);
define_tx_repo!(TxRoleRepository);
define_tx_repo!(TxRolePermissionRepository);
define_tx_repo!(TxUserRoleRepository);

/// 锁定共享事务，事务已提交或回滚时报错
macro_rules! lock_tx {
    ($guard:ident) => {
        $guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?
    };
}

fn binding_scope_column(scope: BindingScope) -> (&'static str, Uuid) {
    match scope {
        BindingScope::Resource(id) => ("resource_id", id.0),
        BindingScope::Permission(id) => ("permission_id", id.0),
    }
}

#[async_trait]
impl ResourceRepository for TxResourceRepository {
    async fn create(&self, resource: &Resource) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query(
            r#"
            INSERT INTO resources (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(resource.id.0)
        .bind(&resource.name)
        .bind(resource.audit_info.created_at)
        .bind(resource.audit_info.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, resource: &Resource) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("UPDATE resources SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(resource.id.0)
            .bind(&resource.name)
            .bind(resource.audit_info.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &ResourceId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ResourceId) -> AppResult<Option<Resource>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let row = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, created_at, updated_at FROM resources WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ResourceRow::into_resource))
    }

    async fn find_by_ids(&self, ids: &[ResourceId]) -> AppResult<Vec<Resource>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let uuids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, ResourceRow>(
            "SELECT id, name, created_at, updated_at FROM resources WHERE id = ANY($1) ORDER BY name",
        )
        .bind(&uuids)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ResourceRow::into_resource).collect())
    }

    async fn exists_by_name(&self, name: &str, exclude: Option<&ResourceId>) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM resources WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}

#[async_trait]
impl PermissionRepository for TxPermissionRepository {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query(
            r#"
            INSERT INTO permissions (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(permission.id.0)
        .bind(&permission.name)
        .bind(permission.audit_info.created_at)
        .bind(permission.audit_info.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, permission: &Permission) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("UPDATE permissions SET name = $2, updated_at = $3 WHERE id = $1")
            .bind(permission.id.0)
            .bind(&permission.name)
            .bind(permission.audit_info.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &PermissionId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let row = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, name, created_at, updated_at FROM permissions WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PermissionRow::into_permission))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let uuids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT id, name, created_at, updated_at FROM permissions WHERE id = ANY($1) ORDER BY name",
        )
        .bind(&uuids)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PermissionRow::into_permission).collect())
    }

    async fn exists_by_name(
        &self,
        name: &str,
        exclude: Option<&PermissionId>,
    ) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM permissions WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}

#[async_trait]
impl ResourcePermissionRepository for TxResourcePermissionRepository {
    async fn find(
        &self,
        resource_id: &ResourceId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<ResourcePermission>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let row = sqlx::query_as::<_, ResourcePermissionRow>(
            r#"
            SELECT id, resource_id, permission_id, created_at, assigned_by
            FROM resource_permissions
            WHERE resource_id = $1 AND permission_id = $2
            "#,
        )
        .bind(resource_id.0)
        .bind(permission_id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ResourcePermissionRow::into_binding))
    }

    async fn insert_if_absent(&self, binding: &ResourcePermission) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query(
            r#"
            INSERT INTO resource_permissions (id, resource_id, permission_id, created_at, assigned_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (resource_id, permission_id) DO NOTHING
            "#,
        )
        .bind(binding.id.0)
        .bind(binding.resource_id.0)
        .bind(binding.permission_id.0)
        .bind(binding.created_at)
        .bind(binding.assigned_by.map(|u| u.0))
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_permission(
        &self,
        permission_id: &PermissionId,
    ) -> AppResult<Vec<ResourcePermission>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let rows = sqlx::query_as::<_, ResourcePermissionRow>(
            r#"
            SELECT id, resource_id, permission_id, created_at, assigned_by
            FROM resource_permissions
            WHERE permission_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(permission_id.0)
        .fetch_all(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ResourcePermissionRow::into_binding).collect())
    }

    async fn delete(&self, id: &ResourcePermissionId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("DELETE FROM resource_permissions WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn count_granted(&self, scope: BindingScope) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let (column, id) = binding_scope_column(scope);
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM role_permissions rp
            JOIN resource_permissions b ON b.id = rp.resource_permission_id
            WHERE b.{} = $1
            "#,
            column
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }

    async fn delete_by_scope(&self, scope: BindingScope) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let (column, id) = binding_scope_column(scope);
        let sql = format!("DELETE FROM resource_permissions WHERE {} = $1", column);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RoleRepository for TxRoleRepository {
    async fn create(&self, role: &Role) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, priority, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(role.id.0)
        .bind(&role.name)
        .bind(role.priority.value())
        .bind(role.audit_info.created_at)
        .bind(role.audit_info.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, role: &Role) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("UPDATE roles SET name = $2, priority = $3, updated_at = $4 WHERE id = $1")
            .bind(role.id.0)
            .bind(&role.name)
            .bind(role.priority.value())
            .bind(role.audit_info.updated_at)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &RoleId) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RoleId) -> AppResult<Option<Role>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, priority, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        row.map(RoleRow::into_role).transpose()
    }

    async fn exists_by_name(&self, name: &str, exclude: Option<&RoleId>) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(name)
        .bind(exclude.map(|id| id.0))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists)
    }
}

#[async_trait]
impl RolePermissionRepository for TxRolePermissionRepository {
    async fn grant(&self, grant: &RolePermission) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query(
            r#"
            INSERT INTO role_permissions (id, role_id, resource_permission_id, granted_at, assigned_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (role_id, resource_permission_id) DO NOTHING
            "#,
        )
        .bind(grant.id.0)
        .bind(grant.role_id.0)
        .bind(grant.resource_permission_id.0)
        .bind(grant.granted_at)
        .bind(grant.assigned_by.map(|u| u.0))
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear(&self, role_id: &RoleId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn revoke_binding(&self, binding_id: &ResourcePermissionId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query("DELETE FROM role_permissions WHERE resource_permission_id = $1")
            .bind(binding_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserRoleRepository for TxUserRoleRepository {
    async fn upsert(&self, grant: &UserRole) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id, assigned_at, assigned_by, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, role_id) DO UPDATE
            SET assigned_at = EXCLUDED.assigned_at,
                assigned_by = EXCLUDED.assigned_by,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(grant.user_id.0)
        .bind(grant.role_id.0)
        .bind(grant.assigned_at)
        .bind(grant.assigned_by.map(|u| u.0))
        .bind(grant.expires_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn remove(&self, user_id: &UserId, role_id: &RoleId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id.0)
            .bind(role_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_by_role(&self, role_id: &RoleId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let result = sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
            .bind(role_id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn count_active_by_role(&self, role_id: &RoleId) -> AppResult<u64> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM user_roles
            WHERE role_id = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(role_id.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }

    async fn highest_priority(&self, user_id: &UserId) -> AppResult<Option<RolePriority>> {
        let mut guard = self.tx.lock().await;
        let tx = lock_tx!(guard);

        let priority: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT MIN(r.priority)
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1 AND (ur.expires_at IS NULL OR ur.expires_at > NOW())
            "#,
        )
        .bind(user_id.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        priority.map(priority_from_db).transpose()
    }
}
