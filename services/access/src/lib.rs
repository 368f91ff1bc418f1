//! storefront-access - 店面访问控制 (RBAC)
//!
//! 资源、权限、按优先级排序的角色、带过期时间的用户角色，以及统一鉴权。

pub mod api;
pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use api::{AccessActions, ActionResponse};
pub use bootstrap::build_actions;
