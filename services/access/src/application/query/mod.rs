//! 读侧查询服务

pub mod handlers;
pub mod queries;

pub use handlers::RbacQueryHandler;
pub use queries::*;
