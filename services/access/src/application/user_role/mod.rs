//! 用户角色应用服务

pub mod commands;
pub mod handlers;

pub use commands::*;
pub use handlers::UserRoleCommandHandler;
