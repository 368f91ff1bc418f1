//! 缓存模块

pub mod moka_cache;
pub mod tagged_cache;

pub use moka_cache::MokaCache;
pub use tagged_cache::{TaggedCache, ttl_until};
