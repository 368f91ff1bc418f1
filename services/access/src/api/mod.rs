//! 对外操作入口

pub mod actions;
pub mod response;

pub use actions::*;
pub use response::ActionResponse;
