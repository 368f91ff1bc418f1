//! 操作结果对象
//!
//! 可预期的失败 (校验、不存在、冲突、权限不足) 以 `{success: false, error}` 返回；
//! 意外故障仍以 `Err(AppError)` 向上传播。

use serde::Serialize;
use storefront_errors::AppResult;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// 把处理结果转换为结果对象，意外错误继续传播
    pub fn from_result(result: AppResult<T>) -> AppResult<Self> {
        match result {
            Ok(data) => Ok(Self::ok(data)),
            Err(e) if e.is_expected() => {
                debug!(error = %e, status = e.status_code(), "Action rejected");
                Ok(Self::failure(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// 没有附加数据的成功结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Done {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storefront_errors::AppError;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Created {
        role_id: String,
    }

    #[test]
    fn test_success_is_flattened() {
        let response = ActionResponse::ok(Created {
            role_id: "r1".into(),
        });
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": true, "roleId": "r1"})
        );
    }

    #[test]
    fn test_expected_error_becomes_failure() {
        let response: ActionResponse<Done> =
            ActionResponse::from_result(Err(AppError::not_found("Role not found"))).unwrap();
        assert!(!response.success);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"success": false, "error": "Role not found"})
        );
    }

    #[test]
    fn test_unexpected_error_propagates() {
        let result: AppResult<ActionResponse<Done>> =
            ActionResponse::from_result(Err(AppError::internal("pool timeout")));
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_done_serializes_to_success_only() {
        assert_eq!(
            serde_json::to_value(ActionResponse::ok(Done {})).unwrap(),
            json!({"success": true})
        );
    }
}
