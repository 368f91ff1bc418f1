//! Unit of Work 模式
//!
//! 提供跨多个 Repository 的事务协调能力，确保操作的原子性。

use async_trait::async_trait;
use storefront_errors::AppResult;

use crate::domain::rbac::{
    PermissionRepository, ResourcePermissionRepository, ResourceRepository,
    RolePermissionRepository, RoleRepository, UserRoleRepository,
};

/// Unit of Work trait
///
/// 协调多个 Repository 在同一事务中的操作。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn resources(&self) -> &dyn ResourceRepository;

    fn permissions(&self) -> &dyn PermissionRepository;

    fn resource_permissions(&self) -> &dyn ResourcePermissionRepository;

    fn roles(&self) -> &dyn RoleRepository;

    fn role_permissions(&self) -> &dyn RolePermissionRepository;

    fn user_roles(&self) -> &dyn UserRoleRepository;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    /// 开始新的事务
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
