//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的缓存后端，使用 Moka 作为底层缓存库。

use super::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 内存缓存后端
///
/// 每个条目单独记录过期时间点，读取时惰性淘汰。
#[derive(Clone)]
pub struct MemoryStore {
    name: String,
    // 值: (数据, 过期时间)
    cache: Cache<String, (Vec<u8>, Option<Instant>)>,
}

impl MemoryStore {
    /// 创建新的内存缓存后端
    ///
    /// # 参数
    ///
    /// * `name` - 后端名称
    /// * `capacity` - 最大条目数
    pub fn new(name: impl Into<String>, capacity: u64) -> Self {
        Self {
            name: name.into(),
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// 当前条目数（近似值）
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    async fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.cache.get(key).await {
            Some((bytes, expire_at)) => {
                if let Some(expire_time) = expire_at {
                    if Instant::now() >= expire_time {
                        self.cache.remove(key).await;
                        debug!("memory get: key={}, expired=true, removed", key);
                        return None;
                    }
                }
                Some(bytes)
            }
            None => None,
        }
    }

    async fn write(&self, key: String, value: Vec<u8>, ttl: Option<Duration>) {
        let expire_at = ttl.map(|ttl| Instant::now() + ttl);
        self.cache.insert(key, (value, expire_at)).await;
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), level = "debug", fields(store = %self.name))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.read(key).await)
    }

    #[instrument(skip(self, keys), level = "debug", fields(store = %self.name, count = keys.len()))]
    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.read(key).await {
                found.insert(key.clone(), bytes);
            }
        }
        debug!("memory get_multiple: requested={}, found={}", keys.len(), found.len());
        Ok(found)
    }

    #[instrument(skip(self, value), level = "debug", fields(store = %self.name))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.write(key.to_string(), value, ttl).await;
        Ok(())
    }

    #[instrument(skip(self, entries), level = "debug", fields(store = %self.name, count = entries.len()))]
    async fn set_multiple(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        for (key, value) in entries {
            self.write(key, value, ttl).await;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(store = %self.name))]
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    #[instrument(skip(self, keys), level = "debug", fields(store = %self.name, count = keys.len()))]
    async fn delete_multiple(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.cache.remove(key).await;
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(store = %self.name))]
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.read(key).await.is_some())
    }
}
