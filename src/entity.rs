//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 实体抽象
//!
//! `Entity` 描述一张表（实体类型）的基本信息；`RowCacheable` 是参与行缓存所需的
//! 能力接口。实体实例的状态由 [`Model`] 承载。

use crate::backend::SharedStore;
use crate::config::{TtlWindow, DEFAULT_PLACEHOLDER};
use crate::error::{CacheError, Result};
use crate::value::{Row, Tuple};
use serde_json::Value;
use std::sync::Arc;

/// 实体类型描述
pub trait Entity: Send + Sync {
    /// 实体类型标识，参与缓存键推导
    fn entity_type(&self) -> &str;

    /// 表名
    fn table(&self) -> &str;

    fn primary_key_name(&self) -> &str {
        "id"
    }

    /// 乐观锁版本列，`None` 表示不启用乐观锁
    fn version_column(&self) -> Option<&str> {
        None
    }

    /// 行缓存能力
    ///
    /// 实现了 [`RowCacheable`] 的类型应覆盖此方法并返回 `Some(self)`。
    fn as_row_cacheable(&self) -> Option<&dyn RowCacheable> {
        None
    }

    fn primary_key_value(&self, row: &Row) -> Option<Value> {
        row.get(self.primary_key_name()).cloned()
    }
}

/// 行缓存能力接口
pub trait RowCacheable: Entity {
    /// 缓存版本，修改后该实体的全部缓存键随之改变
    fn cache_version(&self) -> &str {
        "1"
    }

    /// TTL 窗口，`None` 使用全局配置
    fn cache_ttl(&self) -> Option<TtlWindow> {
        None
    }

    /// 负缓存占位符，`None` 表示禁用负缓存
    fn placeholder_sentinel(&self) -> Option<&str> {
        Some(DEFAULT_PLACEHOLDER)
    }

    /// 缓存后端实例
    fn cache_store(&self) -> SharedStore;

    /// 行变更后需要失效的元组，默认只有主键
    ///
    /// 可追加其它唯一列组合（例如邮箱），每个元组独立失效。
    fn invalidation_tuples(&self, row: &Row) -> Result<Vec<Tuple>> {
        Ok(vec![primary_key_tuple(self, row)?])
    }
}

/// 取出实体的行缓存能力，缺失时返回配置错误
pub fn require_row_cacheable(entity: &dyn Entity) -> Result<&dyn RowCacheable> {
    entity.as_row_cacheable().ok_or_else(|| {
        CacheError::Configuration(format!(
            "Entity '{}' does not support row caching",
            entity.entity_type()
        ))
    })
}

/// 由行数据构造主键元组
pub fn primary_key_tuple<E: Entity + ?Sized>(entity: &E, row: &Row) -> Result<Tuple> {
    let value = entity
        .primary_key_value(row)
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            CacheError::Configuration(format!(
                "Row of '{}' has no value for primary key '{}'",
                entity.entity_type(),
                entity.primary_key_name()
            ))
        })?;
    Ok(Tuple::key(entity.primary_key_name(), value))
}

/// 实体实例
///
/// `original` 保存最近一次与存储同步时的列值，`attributes` 保存当前值，
/// 两者之差即为脏列。
#[derive(Clone)]
pub struct Model {
    entity: Arc<dyn Entity>,
    attributes: Row,
    original: Row,
    exists: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("entity", &self.entity.entity_type())
            .field("attributes", &self.attributes)
            .field("exists", &self.exists)
            .finish()
    }
}

impl Model {
    /// 新实例，尚未写入存储
    pub fn new(entity: Arc<dyn Entity>, attributes: Row) -> Self {
        Self {
            entity,
            attributes,
            original: Row::new(),
            exists: false,
        }
    }

    /// 由存储中读取的行构造实例
    pub fn from_storage(entity: Arc<dyn Entity>, row: Row) -> Self {
        Self {
            entity,
            original: row.clone(),
            attributes: row,
            exists: true,
        }
    }

    pub fn entity(&self) -> &Arc<dyn Entity> {
        &self.entity
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn original(&self) -> &Row {
        &self.original
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(column, value);
    }

    /// 与原始值不同的非版本列
    pub fn dirty(&self) -> Vec<(String, Value)> {
        let version = self.entity.version_column();
        self.attributes
            .iter()
            .filter(|(column, _)| Some(column.as_str()) != version)
            .filter(|(column, value)| self.original.get(column) != Some(*value))
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.original = self.attributes.clone();
        self.exists = true;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.exists = false;
    }
}
