//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 行查找器
//!
//! 单实体查找器与跨实体批量查找器共享同一套步骤：
//! 规划（规范化元组、推导键、去重）、分类（命中 / 负缓存 / 未命中）、
//! 回源（对未命中元组发起一次存储查询并生成缓存写入）。

pub mod batch;
pub mod result;
pub mod single;

use crate::codec::{CachedEntry, EntryCodec, Lookup};
use crate::config::{RowCacheConfig, TtlWindow};
use crate::entity::RowCacheable;
use crate::error::{CacheError, Result};
use crate::key::{build_cache_key, CacheKey};
use crate::storage::{Predicate, RowQuery, RowStorage};
use crate::value::{canonical_scalar, Row, Tuple};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::debug;

pub use batch::{BatchRequest, CrossEntityBatchFinder};
pub use result::BatchResult;
pub use single::SingleEntityRowFinder;

/// 查找器共享设置
#[derive(Debug, Clone)]
pub struct RowCacheSettings {
    pub namespace: String,
    pub codec: EntryCodec,
    pub default_ttl: TtlWindow,
}

impl Default for RowCacheSettings {
    fn default() -> Self {
        Self::from_config(&RowCacheConfig::default())
    }
}

impl RowCacheSettings {
    pub fn from_config(config: &RowCacheConfig) -> Self {
        let codec = if config.compress {
            EntryCodec::with_compression()
        } else {
            EntryCodec::new()
        };
        Self {
            namespace: config.namespace.clone(),
            codec,
            default_ttl: config.ttl,
        }
    }

    /// 推导实体某个元组的缓存键
    pub fn key_for(&self, entity: &dyn RowCacheable, tuple: &Tuple) -> Result<CacheKey> {
        build_cache_key(
            &self.namespace,
            entity.entity_type(),
            entity.primary_key_name(),
            tuple,
            entity.cache_version(),
        )
    }

    /// 为一次写入随机取 TTL
    pub fn ttl_for(&self, entity: &dyn RowCacheable) -> Duration {
        entity.cache_ttl().unwrap_or(self.default_ttl).sample()
    }
}

/// 单个实体本次调用的查找计划
pub(crate) struct EntityPlan<'a> {
    pub entity: &'a dyn RowCacheable,
    /// 所有元组共享的列集合
    pub columns: Vec<String>,
    /// 按键去重后的 (键, 规范化元组)
    pub lookups: Vec<(CacheKey, Tuple)>,
}

impl<'a> EntityPlan<'a> {
    /// 规范化元组并推导键
    ///
    /// 元组为空、含非标量值、列集合不一致或实体 TTL 窗口非法时返回配置错误，
    /// 此时尚未发生任何 I/O。
    pub fn build(
        entity: &'a dyn RowCacheable,
        tuples: &[Tuple],
        settings: &RowCacheSettings,
    ) -> Result<Self> {
        if let Some(window) = entity.cache_ttl() {
            window.validate().map_err(|e| match e {
                CacheError::Configuration(reason) => CacheError::Configuration(format!(
                    "Invalid cache TTL for '{}': {}",
                    entity.entity_type(),
                    reason
                )),
                other => other,
            })?;
        }

        let mut columns: Option<Vec<String>> = None;
        let mut seen = HashSet::with_capacity(tuples.len());
        let mut lookups = Vec::with_capacity(tuples.len());

        for tuple in tuples {
            let normalized = tuple.normalized(entity.primary_key_name())?;
            if normalized.is_empty() {
                return Err(CacheError::Configuration(format!(
                    "Empty lookup tuple for '{}'",
                    entity.entity_type()
                )));
            }

            let tuple_columns: Vec<String> =
                normalized.columns().into_iter().map(str::to_string).collect();
            match &columns {
                None => columns = Some(tuple_columns),
                Some(expected) if *expected != tuple_columns => {
                    return Err(CacheError::Configuration(format!(
                        "Lookup tuples for '{}' use different column sets: {:?} vs {:?}",
                        entity.entity_type(),
                        expected,
                        tuple_columns
                    )));
                }
                Some(_) => {}
            }

            let key = settings.key_for(entity, &normalized)?;
            if seen.insert(key.clone()) {
                lookups.push((key, normalized));
            }
        }

        Ok(Self {
            entity,
            columns: columns.unwrap_or_default(),
            lookups,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.lookups.iter().map(|(key, _)| key)
    }

    /// 根据批量读取结果对每个元组分类
    pub fn partition(
        &self,
        found: &HashMap<String, Vec<u8>>,
        codec: &EntryCodec,
    ) -> Partition {
        let mut partition = Partition::default();
        let sentinel = self.entity.placeholder_sentinel();
        for (key, tuple) in &self.lookups {
            let raw = found.get(key.as_str()).map(Vec::as_slice);
            match codec.classify(raw, self.entity.entity_type(), sentinel) {
                Lookup::Hit(row) => partition.hits.push(row),
                Lookup::Negative => partition.negatives += 1,
                Lookup::Miss => partition.misses.push((key.clone(), tuple.clone())),
            }
        }
        debug!(
            entity = self.entity.entity_type(),
            hits = partition.hits.len(),
            negatives = partition.negatives,
            misses = partition.misses.len(),
            "partitioned lookups"
        );
        partition
    }
}

/// 分类结果
#[derive(Debug, Default)]
pub(crate) struct Partition {
    pub hits: Vec<Row>,
    pub negatives: usize,
    pub misses: Vec<(CacheKey, Tuple)>,
}

/// 回源结果
#[derive(Debug, Default)]
pub(crate) struct Resolution {
    /// 与某个未命中元组对应的存储行
    pub rows: Vec<Row>,
    /// 待写入缓存的 (键, 编码后的条目)
    pub writes: Vec<(String, Vec<u8>)>,
    /// 写入的占位符数量
    pub placeholders: usize,
}

/// 将未命中元组合并为一组按列谓词
///
/// 调用方保证所有元组列集合相同。每列的取值去重后：
/// 单值生成等值谓词，多值生成 IN，全部为 null 生成 IS NULL，
/// null 与具体值混合时生成 `IN (...) OR IS NULL`。
pub(crate) fn merge_predicates(columns: &[String], tuples: &[&Tuple]) -> Vec<Predicate> {
    columns
        .iter()
        .map(|column| {
            let mut has_null = false;
            let mut seen = HashSet::new();
            let mut values: Vec<Value> = Vec::new();
            for tuple in tuples {
                let value = tuple.get(column).cloned().unwrap_or(Value::Null);
                match canonical_scalar(&value) {
                    None => has_null = true,
                    Some(canonical) => {
                        if seen.insert(canonical) {
                            values.push(value);
                        }
                    }
                }
            }

            let column = column.clone();
            match (has_null, values.len()) {
                (true, 0) => Predicate::IsNull { column },
                (true, _) => Predicate::InOrNull { column, values },
                (false, 1) => Predicate::Eq {
                    column,
                    value: values.remove(0),
                },
                (false, _) => Predicate::In { column, values },
            }
        })
        .collect()
}

/// 对未命中元组回源
///
/// 先发起一次结果数上限为未命中元组数的存储查询。返回的每一行按查询列重新推导键，
/// 与未命中元组匹配的写入行数据，其余未命中元组写入占位符（实体禁用负缓存时跳过）。
///
/// 按列合并的条件可能匹配到未请求的列值组合，非唯一列也可能匹配多行，
/// 这些行可能占满上限。结果数达到上限且仍有未匹配元组时，对这些元组再发起一次
/// 不设上限的查询，占位符只在该次查询之后写入。
pub(crate) async fn resolve_misses(
    entity: &dyn RowCacheable,
    columns: &[String],
    misses: &[(CacheKey, Tuple)],
    storage: &dyn RowStorage,
    settings: &RowCacheSettings,
) -> Result<Resolution> {
    let tuples: Vec<&Tuple> = misses.iter().map(|(_, tuple)| tuple).collect();
    let limit = misses.len() as u64;
    let query = RowQuery::new(merge_predicates(columns, &tuples)).limit(limit);
    let fetched = storage.select(entity.table(), &query).await?;
    debug!(
        entity = entity.entity_type(),
        requested = misses.len(),
        fetched = fetched.len(),
        "storage lookup finished"
    );

    let saturated = fetched.len() as u64 >= limit;
    let mut by_key: HashMap<CacheKey, Row> = HashMap::with_capacity(fetched.len());
    index_rows(entity, columns, fetched, settings, &mut by_key);

    if saturated {
        let pending: Vec<&Tuple> = misses
            .iter()
            .filter(|(key, _)| !by_key.contains_key(key))
            .map(|(_, tuple)| tuple)
            .collect();
        if !pending.is_empty() {
            let query = RowQuery::new(merge_predicates(columns, &pending));
            let fetched = storage.select(entity.table(), &query).await?;
            debug!(
                entity = entity.entity_type(),
                pending = pending.len(),
                fetched = fetched.len(),
                "limit reached, unmatched tuples re-queried"
            );
            index_rows(entity, columns, fetched, settings, &mut by_key);
        }
    }

    let mut resolution = Resolution::default();
    let sentinel = entity.placeholder_sentinel();
    for (key, _) in misses {
        let entry = match by_key.remove(key) {
            Some(row) => {
                let entry = CachedEntry::Row {
                    entity: entity.entity_type().to_string(),
                    row: row.clone(),
                };
                resolution.rows.push(row);
                entry
            }
            None => match sentinel {
                Some(sentinel) => {
                    resolution.placeholders += 1;
                    CachedEntry::Placeholder {
                        sentinel: sentinel.to_string(),
                    }
                }
                None => continue,
            },
        };
        resolution
            .writes
            .push((key.as_str().to_string(), settings.codec.encode(&entry)?));
    }

    Ok(resolution)
}

/// 按查询列重新推导键，同一键只保留第一行
fn index_rows(
    entity: &dyn RowCacheable,
    columns: &[String],
    rows: Vec<Row>,
    settings: &RowCacheSettings,
    by_key: &mut HashMap<CacheKey, Row>,
) {
    for row in rows {
        let tuple = Tuple::from_row(&row, columns.iter().map(String::as_str));
        match settings.key_for(entity, &tuple) {
            Ok(key) => {
                by_key.entry(key).or_insert(row);
            }
            Err(e) => debug!("skipping row that cannot be re-keyed: {}", e),
        }
    }
}
