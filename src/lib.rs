//! oxrowcache - 行缓存层
//!
//! 在关系存储前提供按唯一键元组读穿的行缓存：
//! 负缓存、跨实体批量查找（同一后端实例每次调用至多一读一写）、
//! 写后失效以及基于版本列的乐观锁更新。

#![doc(html_root_url = "https://docs.rs/oxrowcache/0.1.0")]

pub use serde_json;

pub mod backend;
pub mod cli;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod finder;
pub mod invalidation;
pub mod key;
pub mod locking;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod persist;
pub mod storage;
pub mod value;

// Re-export commonly used items
pub use backend::{CacheStore, MemoryStore, NullStore, RedisStore, SharedStore};
pub use config::{RowCacheConfig, TtlWindow};
pub use entity::{Entity, Model, RowCacheable};
pub use error::{CacheError, Result};
pub use finder::{BatchRequest, BatchResult, CrossEntityBatchFinder, SingleEntityRowFinder};
pub use invalidation::WriteInvalidator;
pub use key::{build_cache_key, CacheKey};
pub use locking::{OptimisticLock, VersionState};
pub use manager::RowCacheManager;
pub use persist::{ModelWriter, SaveOutcome};
pub use storage::{Predicate, RowQuery, RowStorage, SeaOrmStorage};
pub use value::{Row, Tuple};

/// oxrowcache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
