//! 授权检查

pub mod service;

pub use service::{AuthorizationService, GrantedPermission};
