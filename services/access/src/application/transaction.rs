//! 事务收尾

use storefront_errors::AppResult;
use tracing::warn;

use crate::domain::UnitOfWork;

/// 根据处理结果提交或回滚
///
/// 回滚失败只记录日志，返回原始错误。
pub async fn complete<T>(uow: Box<dyn UnitOfWork>, result: AppResult<T>) -> AppResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}
