//! 资源实体

use serde::{Deserialize, Serialize};
use storefront_common::AuditInfo;

use super::normalize_name;
use crate::error::AccessError;

entity_id!(
    /// 资源 ID
    ResourceId
);

/// 资源：可被保护的名词，例如 "products"、"orders"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub audit_info: AuditInfo,
}

impl Resource {
    pub fn new(name: &str) -> Result<Self, AccessError> {
        Ok(Self {
            id: ResourceId::new(),
            name: normalize_name("Resource", name)?,
            audit_info: AuditInfo::new(),
        })
    }

    /// 重命名
    pub fn rename(&mut self, name: &str) -> Result<(), AccessError> {
        self.name = normalize_name("Resource", name)?;
        self.audit_info.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_resource() {
        let resource = Resource::new(" products ").unwrap();
        assert_eq!(resource.name, "products");
    }

    #[test]
    fn test_rename_keeps_id() {
        let mut resource = Resource::new("products").unwrap();
        let id = resource.id;
        resource.rename("catalog").unwrap();
        assert_eq!(resource.id, id);
        assert_eq!(resource.name, "catalog");
        assert!(resource.rename("").is_err());
        assert_eq!(resource.name, "catalog");
    }
}
