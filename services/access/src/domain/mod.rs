//! 领域层

pub mod rbac;
pub mod unit_of_work;

pub use unit_of_work::{UnitOfWork, UnitOfWorkFactory};
