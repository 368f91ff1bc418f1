use storefront_errors::AppError;
use thiserror::Error;

/// 访问控制领域错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("{0} name is required")]
    NameRequired(&'static str),
    #[error("{0} name cannot exceed {1} characters")]
    NameTooLong(&'static str, usize),
    #[error("Invalid {0} id")]
    InvalidId(&'static str),
    #[error("Priority must be an integer between 1 and 999")]
    InvalidPriority,
    #[error("priority_min cannot be greater than priority_max")]
    InvalidPriorityRange,
    #[error("At least one permission is required")]
    EmptyPermissionSelection,
    #[error("resourceIds must not be empty; omit it to grant every bound resource")]
    EmptyResourceSelection,
    #[error("expires_at must be in the future")]
    ExpiryInPast,
    #[error("Resource not found")]
    ResourceNotFound,
    #[error("Permission not found")]
    PermissionNotFound,
    #[error("Role not found")]
    RoleNotFound,
    #[error("Resource with name '{0}' already exists")]
    ResourceAlreadyExists(String),
    #[error("Permission with name '{0}' already exists")]
    PermissionAlreadyExists(String),
    #[error("Role with name '{0}' already exists")]
    RoleAlreadyExists(String),
    #[error("Insufficient privileges: you can only manage roles with lower privilege than your own")]
    InsufficientPrivileges,
    #[error("Cannot delete {0}: it is referenced by other records")]
    StillReferenced(&'static str),
}

impl From<AccessError> for AppError {
    fn from(error: AccessError) -> Self {
        let message = error.to_string();
        match error {
            AccessError::ResourceNotFound
            | AccessError::PermissionNotFound
            | AccessError::RoleNotFound => AppError::NotFound(message),
            AccessError::ResourceAlreadyExists(_)
            | AccessError::PermissionAlreadyExists(_)
            | AccessError::RoleAlreadyExists(_)
            | AccessError::StillReferenced(_) => AppError::Conflict(message),
            AccessError::InsufficientPrivileges => AppError::Forbidden(message),
            AccessError::NameRequired(_)
            | AccessError::NameTooLong(..)
            | AccessError::InvalidId(_)
            | AccessError::InvalidPriority
            | AccessError::InvalidPriorityRange
            | AccessError::EmptyPermissionSelection
            | AccessError::EmptyResourceSelection
            | AccessError::ExpiryInPast => AppError::Validation(message),
        }
    }
}

/// 解析字符串形式的实体 ID
pub fn parse_id<T: std::str::FromStr>(raw: &str, kind: &'static str) -> Result<T, AccessError> {
    raw.parse().map_err(|_| AccessError::InvalidId(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rbac::RoleId;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(AppError::from(AccessError::RoleNotFound), AppError::NotFound(m) if m == "Role not found"));
        assert!(matches!(
            AppError::from(AccessError::RoleAlreadyExists("Manager".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(AccessError::InsufficientPrivileges),
            AppError::Forbidden(m) if m.starts_with("Insufficient privileges")
        ));
        assert!(matches!(AppError::from(AccessError::InvalidPriority), AppError::Validation(_)));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(
            parse_id::<RoleId>("nope", "role"),
            Err(AccessError::InvalidId("role"))
        );
        let id = RoleId::new();
        assert_eq!(parse_id::<RoleId>(&id.to_string(), "role").unwrap(), id);
    }
}
