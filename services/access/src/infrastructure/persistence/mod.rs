//! 持久化层模块

pub mod access_unit_of_work;
pub mod db_metrics;
pub mod error_mapper;
pub mod query_repository;
pub(crate) mod rows;
pub mod tx_repositories;

pub use access_unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
pub use db_metrics::DbMetrics;
pub use query_repository::PostgresRbacQueryRepository;
