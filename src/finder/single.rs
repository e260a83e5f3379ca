//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 单实体行查找器：按唯一键元组读穿缓存，并对不存在的行做负缓存。

use super::{resolve_misses, EntityPlan, RowCacheSettings};
use crate::entity::{require_row_cacheable, Entity};
use crate::error::Result;
use crate::metrics::{Outcome, GLOBAL_METRICS};
use crate::storage::RowStorage;
use crate::value::{Row, Tuple};
use std::sync::Arc;
use tracing::{debug, instrument};

/// 单实体行查找器
///
/// 每次调用至多一次批量读取、一次存储查询和一次批量写入。
/// 缓存后端和存储的错误原样返回，不做重试。
pub struct SingleEntityRowFinder {
    entity: Arc<dyn Entity>,
    storage: Arc<dyn RowStorage>,
    settings: Arc<RowCacheSettings>,
}

impl SingleEntityRowFinder {
    /// 创建查找器，实体不具备行缓存能力时返回配置错误
    pub fn new(
        entity: Arc<dyn Entity>,
        storage: Arc<dyn RowStorage>,
        settings: Arc<RowCacheSettings>,
    ) -> Result<Self> {
        require_row_cacheable(entity.as_ref())?;
        Ok(Self {
            entity,
            storage,
            settings,
        })
    }

    pub fn entity(&self) -> &Arc<dyn Entity> {
        &self.entity
    }

    /// 按元组批量查找
    ///
    /// 结果顺序不保证与输入一致，重复元组只返回一次。
    #[instrument(skip(self, tuples), level = "debug", fields(entity = %self.entity.entity_type(), tuples = tuples.len()))]
    pub async fn find_by_tuples(&self, tuples: &[Tuple]) -> Result<Vec<Row>> {
        if tuples.is_empty() {
            return Ok(Vec::new());
        }

        let entity = require_row_cacheable(self.entity.as_ref())?;
        let plan = EntityPlan::build(entity, tuples, &self.settings)?;
        let store = entity.cache_store();

        let keys: Vec<String> = plan.keys().map(|k| k.as_str().to_string()).collect();
        let found = store.get_multiple(&keys).await?;

        let partition = plan.partition(&found, &self.settings.codec);
        GLOBAL_METRICS.record(entity.entity_type(), Outcome::Hit, partition.hits.len());
        GLOBAL_METRICS.record(entity.entity_type(), Outcome::Negative, partition.negatives);
        GLOBAL_METRICS.record(entity.entity_type(), Outcome::Miss, partition.misses.len());

        let mut rows = partition.hits;
        if partition.misses.is_empty() {
            return Ok(rows);
        }

        let resolution = resolve_misses(
            entity,
            &plan.columns,
            &partition.misses,
            self.storage.as_ref(),
            &self.settings,
        )
        .await?;

        if !resolution.writes.is_empty() {
            let ttl = self.settings.ttl_for(entity);
            debug!(
                "populating {} entries in {} (ttl={}s)",
                resolution.writes.len(),
                store.name(),
                ttl.as_secs()
            );
            store.set_multiple(resolution.writes, Some(ttl)).await?;
        }
        GLOBAL_METRICS.record(entity.entity_type(), Outcome::Stored, resolution.rows.len());
        GLOBAL_METRICS.record(
            entity.entity_type(),
            Outcome::Placeholder,
            resolution.placeholders,
        );

        rows.extend(resolution.rows);
        Ok(rows)
    }

    /// 按单个元组查找
    pub async fn find_one(&self, tuple: Tuple) -> Result<Option<Row>> {
        Ok(self.find_by_tuples(&[tuple]).await?.into_iter().next())
    }

    /// 按主键值查找
    pub async fn find_by_key(&self, value: impl Into<serde_json::Value>) -> Result<Option<Row>> {
        let tuple = Tuple::key(self.entity.primary_key_name(), value);
        self.find_one(tuple).await
    }
}
