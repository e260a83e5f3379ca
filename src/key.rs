//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存键生成
//!
//! 缓存键由实体类型、规范化后的元组和缓存版本确定性地推导：
//! `<namespace><sha256(hex)><murmur3_32(hex)>`。
//! 同一组列值无论顺序如何都得到同一个键；修改版本号即可整体失效。

use crate::error::{CacheError, Result};
use crate::value::{canonical_scalar, Tuple};
use murmur3::murmur3_32;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// 生成元组的规范字符串：`<type>:<sorted-json-map>:<version>`
pub fn canonical_form(
    entity_type: &str,
    primary_key: &str,
    tuple: &Tuple,
    version: &str,
) -> Result<String> {
    let normalized = tuple.normalized(primary_key)?;
    let map: BTreeMap<&str, Option<String>> = normalized
        .iter()
        .map(|(column, value)| (column.as_str(), canonical_scalar(value)))
        .collect();
    let encoded =
        serde_json::to_string(&map).map_err(|e| CacheError::Serialization(e.to_string()))?;
    Ok(format!("{}:{}:{}", entity_type, encoded, version))
}

/// 推导缓存键
///
/// 纯函数，无 I/O。元组中含有非标量值时返回配置错误。
pub fn build_cache_key(
    namespace: &str,
    entity_type: &str,
    primary_key: &str,
    tuple: &Tuple,
    version: &str,
) -> Result<CacheKey> {
    let canonical = canonical_form(entity_type, primary_key, tuple, version)?;

    let digest = Sha256::digest(canonical.as_bytes());
    let checksum = murmur3_32(&mut Cursor::new(canonical.as_bytes()), 0)?;

    Ok(CacheKey(format!(
        "{}{}{:08x}",
        namespace,
        hex::encode(digest),
        checksum
    )))
}
