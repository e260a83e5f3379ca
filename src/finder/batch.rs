//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 跨实体批量查找器
//!
//! 按缓存后端实例对实体类型分组：同一实例上的所有键合并为一次批量读取，
//! 所有回源结果合并为至多一次批量写入。存储查询仍按实体类型分别执行。

use super::{resolve_misses, BatchResult, EntityPlan, RowCacheSettings};
use crate::backend::{SharedStore, StoreId};
use crate::entity::{require_row_cacheable, Entity, RowCacheable};
use crate::error::{CacheError, Result};
use crate::metrics::{Outcome, GLOBAL_METRICS};
use crate::storage::RowStorage;
use crate::value::{Row, Tuple};
use ahash::{AHashMap, AHashSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// 批量查找请求
#[derive(Clone, Default)]
pub struct BatchRequest {
    entries: Vec<(Arc<dyn Entity>, Vec<Tuple>)>,
    /// 同一实体类型却指向不同表、缓存版本或后端的追加请求
    conflicts: Vec<String>,
}

impl std::fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(entity, tuples)| (entity.entity_type(), tuples.len())),
            )
            .finish()
    }
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        entity: Arc<dyn Entity>,
        tuples: impl IntoIterator<Item = Tuple>,
    ) -> Self {
        self.push(entity, tuples);
        self
    }

    /// 追加请求，同一实体类型的元组合并到一起
    ///
    /// 合并时沿用先加入的实体描述。后加入的描述与之表名、缓存版本或后端实例不同时，
    /// 记为冲突，[`CrossEntityBatchFinder::find_many`] 在任何 I/O 之前返回配置错误。
    pub fn push(&mut self, entity: Arc<dyn Entity>, tuples: impl IntoIterator<Item = Tuple>) {
        if let Some((existing_entity, existing)) = self
            .entries
            .iter_mut()
            .find(|(e, _)| e.entity_type() == entity.entity_type())
        {
            if !same_cache_identity(existing_entity.as_ref(), entity.as_ref()) {
                self.conflicts.push(format!(
                    "Entity type '{}' was added with conflicting table, cache version or store",
                    entity.entity_type()
                ));
            }
            existing.extend(tuples);
        } else {
            self.entries.push((entity, tuples.into_iter().collect()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn same_cache_identity(a: &dyn Entity, b: &dyn Entity) -> bool {
    if a.table() != b.table() || a.primary_key_name() != b.primary_key_name() {
        return false;
    }
    match (a.as_row_cacheable(), b.as_row_cacheable()) {
        (Some(a), Some(b)) => {
            a.cache_version() == b.cache_version()
                && StoreId::of(&a.cache_store()) == StoreId::of(&b.cache_store())
        }
        (None, None) => true,
        _ => false,
    }
}

/// 共享同一后端实例的实体集合
struct StoreGroup {
    store: SharedStore,
    /// 指向计划列表的下标
    members: Vec<usize>,
}

/// 跨实体批量查找器
pub struct CrossEntityBatchFinder {
    storage: Arc<dyn RowStorage>,
    settings: Arc<RowCacheSettings>,
}

impl CrossEntityBatchFinder {
    pub fn new(storage: Arc<dyn RowStorage>, settings: Arc<RowCacheSettings>) -> Self {
        Self { storage, settings }
    }

    /// 批量查找多个实体类型
    ///
    /// 请求中有冲突的实体描述、任一实体缺少行缓存能力、元组列集合不一致或含非标量值时，
    /// 在发生任何缓存或存储 I/O 之前返回配置错误。
    #[instrument(skip(self, request), level = "debug", fields(entities = request.len()))]
    pub async fn find_many(&self, request: &BatchRequest) -> Result<BatchResult> {
        if let Some(conflict) = request.conflicts.first() {
            return Err(CacheError::Configuration(conflict.clone()));
        }

        let mut cacheables: Vec<(&dyn RowCacheable, &[Tuple])> =
            Vec::with_capacity(request.entries.len());
        for (entity, tuples) in &request.entries {
            cacheables.push((require_row_cacheable(entity.as_ref())?, tuples.as_slice()));
        }

        let mut rows: BTreeMap<String, Vec<Row>> = BTreeMap::new();
        let mut plans = Vec::with_capacity(cacheables.len());
        for (entity, tuples) in cacheables {
            rows.entry(entity.entity_type().to_string()).or_default();
            if !tuples.is_empty() {
                plans.push(EntityPlan::build(entity, tuples, &self.settings)?);
            }
        }

        let groups = Self::group_by_store(&plans);
        debug!(
            "resolving {} entity types across {} cache stores",
            plans.len(),
            groups.len()
        );

        for group in &groups {
            let mut seen = AHashSet::new();
            let keys: Vec<String> = group
                .members
                .iter()
                .flat_map(|&i| plans[i].keys())
                .filter(|key| seen.insert(key.as_str()))
                .map(|key| key.as_str().to_string())
                .collect();
            let found = group.store.get_multiple(&keys).await?;

            let mut writes = Vec::new();
            let mut ttl: Option<Duration> = None;
            for &i in &group.members {
                let plan = &plans[i];
                let entity = plan.entity;
                let partition = plan.partition(&found, &self.settings.codec);
                GLOBAL_METRICS.record(entity.entity_type(), Outcome::Hit, partition.hits.len());
                GLOBAL_METRICS.record(entity.entity_type(), Outcome::Negative, partition.negatives);
                GLOBAL_METRICS.record(entity.entity_type(), Outcome::Miss, partition.misses.len());

                let bucket = rows.entry(entity.entity_type().to_string()).or_default();
                bucket.extend(partition.hits);
                if partition.misses.is_empty() {
                    continue;
                }

                let resolution = resolve_misses(
                    entity,
                    &plan.columns,
                    &partition.misses,
                    self.storage.as_ref(),
                    &self.settings,
                )
                .await?;
                GLOBAL_METRICS.record(entity.entity_type(), Outcome::Stored, resolution.rows.len());
                GLOBAL_METRICS.record(
                    entity.entity_type(),
                    Outcome::Placeholder,
                    resolution.placeholders,
                );

                if !resolution.writes.is_empty() {
                    let sampled = self.settings.ttl_for(entity);
                    ttl = Some(ttl.map_or(sampled, |current| current.min(sampled)));
                    writes.extend(resolution.writes);
                }
                bucket.extend(resolution.rows);
            }

            if !writes.is_empty() {
                debug!(
                    "populating {} entries in {} (ttl={:?})",
                    writes.len(),
                    group.store.name(),
                    ttl
                );
                group.store.set_multiple(writes, ttl).await?;
            }
        }

        Ok(BatchResult::new(rows))
    }

    /// 按后端实例身份分组，保持首次出现的顺序
    fn group_by_store(plans: &[EntityPlan<'_>]) -> Vec<StoreGroup> {
        let mut groups: Vec<StoreGroup> = Vec::new();
        let mut index: AHashMap<StoreId, usize> = AHashMap::new();
        for (i, plan) in plans.iter().enumerate() {
            let store = plan.entity.cache_store();
            let id = StoreId::of(&store);
            match index.get(&id) {
                Some(&g) => groups[g].members.push(i),
                None => {
                    index.insert(id, groups.len());
                    groups.push(StoreGroup {
                        store,
                        members: vec![i],
                    });
                }
            }
        }
        groups
    }
}
