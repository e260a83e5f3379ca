//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了行缓存的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_VERSION: u32 = 1;

/// 默认键命名空间
pub const DEFAULT_NAMESPACE: &str = "model:";

/// 实体默认的负缓存占位符
pub const DEFAULT_PLACEHOLDER: &str = "__oxrowcache_placeholder__";

/// 5 天
pub const DEFAULT_TTL_MIN_SECS: u64 = 5 * 24 * 3600;
/// 7 天
pub const DEFAULT_TTL_MAX_SECS: u64 = 7 * 24 * 3600;

lazy_static! {
    static ref NAMESPACE_PATTERN: Regex =
        Regex::new(r"^[A-Za-z0-9_:.\-]+$").expect("namespace pattern is valid");
}

/// 行缓存配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RowCacheConfig {
    pub config_version: Option<u32>,
    /// 缓存键前缀
    pub namespace: String,
    /// 缓存条目的 TTL 窗口
    pub ttl: TtlWindow,
    /// 是否压缩缓存中的行数据
    pub compress: bool,
    /// Redis 后端配置（可选）
    pub redis: Option<RedisStoreConfig>,
}

impl Default for RowCacheConfig {
    fn default() -> Self {
        Self {
            config_version: Some(CONFIG_VERSION),
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: TtlWindow::default(),
            compress: false,
            redis: None,
        }
    }
}

impl RowCacheConfig {
    /// 从 TOML 字符串解析配置并验证
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RowCacheConfig = toml::from_str(content)
            .map_err(|e| CacheError::Configuration(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(CacheError::Configuration(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                )));
            }
        }

        if self.namespace.is_empty() || !NAMESPACE_PATTERN.is_match(&self.namespace) {
            return Err(CacheError::Configuration(format!(
                "Invalid namespace '{}'",
                self.namespace
            )));
        }

        self.ttl.validate()?;

        if let Some(redis) = &self.redis {
            redis.validate()?;
        }

        Ok(())
    }
}

/// TTL 窗口
///
/// 每次写入缓存时在 `[min_secs, max_secs]` 中随机取值，避免大量条目同时过期。
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TtlWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for TtlWindow {
    fn default() -> Self {
        Self {
            min_secs: DEFAULT_TTL_MIN_SECS,
            max_secs: DEFAULT_TTL_MAX_SECS,
        }
    }
}

impl TtlWindow {
    /// 以秒为粒度构造，不足一秒的部分被舍去，因此小于一秒的时长得到非法的零窗口
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min_secs: min.as_secs(),
            max_secs: max.as_secs(),
        }
    }

    /// 固定 TTL（不抖动）
    pub fn fixed(ttl: Duration) -> Self {
        Self::new(ttl, ttl)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_secs == 0 {
            return Err(CacheError::Configuration(
                "ttl.min_secs cannot be zero".to_string(),
            ));
        }
        if self.min_secs > self.max_secs {
            return Err(CacheError::Configuration(format!(
                "ttl.min_secs ({}) exceeds ttl.max_secs ({})",
                self.min_secs, self.max_secs
            )));
        }
        Ok(())
    }

    /// 在窗口内随机取一个 TTL
    pub fn sample(&self) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs(secs)
    }
}

/// Redis模式枚举
#[derive(Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    #[default]
    Standalone,
    Cluster,
}

/// Redis 缓存后端配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisStoreConfig {
    pub mode: RedisMode,
    /// 连接字符串（单机模式）
    pub connection_string: SecretString,
    /// 集群初始节点
    pub nodes: Vec<String>,
    /// Redis 密码（集群模式）
    pub password: Option<SecretString>,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 是否启用 TLS
    pub enable_tls: bool,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            mode: RedisMode::Standalone,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            nodes: Vec::new(),
            password: None,
            connection_timeout_ms: 5000,
            enable_tls: false,
        }
    }
}

impl RedisStoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.connection_timeout_ms == 0 {
            return Err(CacheError::Configuration(
                "redis.connection_timeout_ms cannot be zero".to_string(),
            ));
        }
        if self.mode == RedisMode::Cluster && self.nodes.is_empty() {
            return Err(CacheError::Configuration(
                "redis.nodes is required in cluster mode".to_string(),
            ));
        }
        Ok(())
    }
}
