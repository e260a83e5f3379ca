//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 空缓存后端：写入即丢弃，读取总是未命中。

use super::CacheStore;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// 空缓存后端
///
/// 实体未配置缓存时可显式传入，使所有查询直达存储层。
#[derive(Debug, Clone, Default)]
pub struct NullStore;

#[async_trait]
impl CacheStore for NullStore {
    fn name(&self) -> &str {
        "null"
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn get_multiple(&self, _keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        Ok(HashMap::new())
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }

    async fn set_multiple(
        &self,
        _entries: Vec<(String, Vec<u8>)>,
        _ttl: Option<Duration>,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_multiple(&self, _keys: &[String]) -> Result<()> {
        Ok(())
    }

    async fn has(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }
}
