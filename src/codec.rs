//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存条目在后端中的编码格式。

use crate::error::{CacheError, Result};
use crate::value::Row;
use serde::{Deserialize, Serialize};

/// 缓存中保存的条目
///
/// 同一个键只会保存行数据或占位符之一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedEntry {
    /// 实体行数据
    Row { entity: String, row: Row },
    /// 负缓存占位符：存储中确认不存在
    Placeholder { sentinel: String },
}

/// 读取缓存值后的分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(Row),
    Negative,
    Miss,
}

/// 条目编解码器
///
/// 使用 JSON 编码，可选 gzip 压缩。
#[derive(Debug, Clone, Default)]
pub struct EntryCodec {
    compress: bool,
}

impl EntryCodec {
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的编解码器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }

    pub fn encode(&self, entry: &CachedEntry) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        if !self.compress {
            return Ok(json_bytes);
        }

        #[cfg(feature = "compression")]
        {
            use flate2::write::GzEncoder;
            use flate2::Compression;
            use std::io::Write;

            let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
            encoder
                .write_all(&json_bytes)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CacheError::Serialization(e.to_string()))
        }

        #[cfg(not(feature = "compression"))]
        {
            Ok(json_bytes)
        }
    }

    pub fn decode(&self, data: &[u8]) -> Result<CachedEntry> {
        #[cfg(feature = "compression")]
        let json_bytes = if self.compress {
            use flate2::read::GzDecoder;
            use std::io::Read;

            let mut decoder = GzDecoder::new(data);
            let mut decoded = Vec::new();
            decoder
                .read_to_end(&mut decoded)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            decoded
        } else {
            data.to_vec()
        };

        #[cfg(not(feature = "compression"))]
        let json_bytes = data.to_vec();

        serde_json::from_slice(&json_bytes).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// 对缓存原始值分类
    ///
    /// 行数据必须属于 `entity_type`；占位符必须与实体当前的占位符一致，
    /// 实体禁用负缓存时（`sentinel` 为 `None`）任何占位符都视为未命中。
    /// 无法解码的值同样视为未命中。
    pub fn classify(&self, raw: Option<&[u8]>, entity_type: &str, sentinel: Option<&str>) -> Lookup {
        let Some(raw) = raw else {
            return Lookup::Miss;
        };
        match self.decode(raw) {
            Ok(CachedEntry::Row { entity, row }) if entity == entity_type => Lookup::Hit(row),
            Ok(CachedEntry::Placeholder { sentinel: stored })
                if sentinel.is_some_and(|s| s == stored) =>
            {
                Lookup::Negative
            }
            _ => Lookup::Miss,
        }
    }
}
