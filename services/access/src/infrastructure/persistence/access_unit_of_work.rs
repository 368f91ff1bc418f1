//! PostgreSQL Unit of Work 实现

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use storefront_adapter_postgres::TransactionManager;
use storefront_errors::{AppError, AppResult};
use tokio::sync::Mutex;

use super::tx_repositories::{
    SharedTx, TxPermissionRepository, TxResourcePermissionRepository, TxResourceRepository,
    TxRolePermissionRepository, TxRoleRepository, TxUserRoleRepository,
};
use crate::domain::rbac::{
    PermissionRepository, ResourcePermissionRepository, ResourceRepository,
    RolePermissionRepository, RoleRepository, UserRoleRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Postgres Unit of Work 工厂
pub struct PostgresUnitOfWorkFactory {
    transactions: TransactionManager,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(transactions: TransactionManager) -> Self {
        Self { transactions }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.transactions.begin().await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}

/// Postgres Unit of Work 实现
pub struct PostgresUnitOfWork {
    tx: SharedTx,
    resource_repo: TxResourceRepository,
    permission_repo: TxPermissionRepository,
    resource_permission_repo: TxResourcePermissionRepository,
    role_repo: TxRoleRepository,
    role_permission_repo: TxRolePermissionRepository,
    user_role_repo: TxUserRoleRepository,
}

impl PostgresUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            tx: tx.clone(),
            resource_repo: TxResourceRepository::new(tx.clone()),
            permission_repo: TxPermissionRepository::new(tx.clone()),
            resource_permission_repo: TxResourcePermissionRepository::new(tx.clone()),
            role_repo: TxRoleRepository::new(tx.clone()),
            role_permission_repo: TxRolePermissionRepository::new(tx.clone()),
            user_role_repo: TxUserRoleRepository::new(tx),
        }
    }

    async fn take(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn resources(&self) -> &dyn ResourceRepository {
        &self.resource_repo
    }

    fn permissions(&self) -> &dyn PermissionRepository {
        &self.permission_repo
    }

    fn resource_permissions(&self) -> &dyn ResourcePermissionRepository {
        &self.resource_permission_repo
    }

    fn roles(&self) -> &dyn RoleRepository {
        &self.role_repo
    }

    fn role_permissions(&self) -> &dyn RolePermissionRepository {
        &self.role_permission_repo
    }

    fn user_roles(&self) -> &dyn UserRoleRepository {
        &self.user_role_repo
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::commit(tx).await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::rollback(tx).await
    }
}
