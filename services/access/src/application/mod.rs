//! 应用层
//!
//! 命令处理器在 Unit of Work 中执行写操作，提交后分发领域事件；
//! 查询处理器经由带标签的缓存读取。

pub mod authorization;
pub mod events;
pub mod permission;
pub mod query;
pub mod resource;
pub mod role;
pub mod transaction;
pub mod user_role;

pub use authorization::AuthorizationService;
pub use events::EventDispatcher;
pub use permission::PermissionCommandHandler;
pub use query::RbacQueryHandler;
pub use resource::ResourceCommandHandler;
pub use role::RoleCommandHandler;
pub use user_role::UserRoleCommandHandler;
