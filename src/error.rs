//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了行缓存层的错误类型。
//!
//! 错误分为四类：配置错误（在任何 I/O 之前快速失败）、缓存后端错误、
//! 存储错误（均原样向上传播，本层不做重试），以及乐观锁冲突。

use thiserror::Error;

/// 行缓存错误类型枚举
#[derive(Error, Debug)]
pub enum CacheError {
    /// 配置错误：实体缺少行缓存能力、同一批次中列集合不一致、元组值不是标量等
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 缓存后端操作失败
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 存储操作失败
    #[error("Storage error: {0}")]
    Storage(String),

    /// Sea-ORM数据库错误
    #[error("Sea-ORM error: {0}")]
    SeaOrm(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 乐观锁冲突：条件 UPDATE 未影响任何行
    #[error(
        "Optimistic lock failure on {entity} (primary key {primary_key}): expected version {expected_version}"
    )]
    OptimisticLockFailure {
        entity: String,
        primary_key: String,
        expected_version: i64,
    },

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// 是否为乐观锁冲突，调用方可据此重试“读-改-写”流程
    pub fn is_optimistic_lock_failure(&self) -> bool {
        matches!(self, CacheError::OptimisticLockFailure { .. })
    }

    /// 是否为配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(self, CacheError::Configuration(_))
    }

    /// 是否来自缓存后端
    pub fn is_backend(&self) -> bool {
        matches!(self, CacheError::Backend(_) | CacheError::Redis(_))
    }

    /// 是否来自存储层
    pub fn is_storage(&self) -> bool {
        matches!(self, CacheError::Storage(_) | CacheError::SeaOrm(_))
    }
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;
