//! PostgreSQL 事务管理模块

use sqlx::{PgPool, Postgres, Transaction};
use storefront_errors::{AppError, AppResult};
use tracing::debug;

/// 事务管理器
///
/// 事务沿用 PostgreSQL 默认的 READ COMMITTED 隔离级别。
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开始事务
    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::internal(format!("Failed to begin transaction: {}", e)))?;

        debug!("Transaction started");
        Ok(tx)
    }

    /// 提交事务；提交失败时结果未知，按意外故障上抛
    pub async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::internal(format!("Failed to commit transaction: {}", e)))
    }

    /// 回滚事务
    pub async fn rollback(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.rollback()
            .await
            .map_err(|e| AppError::internal(format!("Failed to rollback transaction: {}", e)))
    }
}
