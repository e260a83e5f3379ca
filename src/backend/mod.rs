//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存后端的统一接口及其实现：内存（Moka）、Redis 和空实现。

pub mod memory;
pub mod null;
pub mod redis_store;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryStore;
pub use null::NullStore;
pub use redis_store::RedisStore;

/// 缓存后端接口
///
/// `ttl` 为 `None` 表示永不过期。批量操作不保证跨键原子性。
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 后端名称，用于日志
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 批量读取，返回中只包含存在的键
    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    async fn set_multiple(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>)
        -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn delete_multiple(&self, keys: &[String]) -> Result<()>;

    async fn has(&self, key: &str) -> Result<bool>;
}

/// 缓存后端句柄
pub type SharedStore = Arc<dyn CacheStore>;

/// 后端实例标识
///
/// 以 `Arc` 所指对象的地址区分实例，配置相同的两个实例也视为不同后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(usize);

impl StoreId {
    pub fn of(store: &SharedStore) -> Self {
        StoreId(Arc::as_ptr(store) as *const () as usize)
    }
}
