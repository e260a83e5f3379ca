//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了写操作后的缓存失效。

use crate::entity::Entity;
use crate::error::Result;
use crate::finder::RowCacheSettings;
use crate::metrics::{Outcome, GLOBAL_METRICS};
use crate::value::Row;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// 写后失效器
///
/// 对实体声明的每个失效元组推导缓存键，并以一次批量删除移除。
#[derive(Debug, Clone)]
pub struct WriteInvalidator {
    settings: Arc<RowCacheSettings>,
}

impl WriteInvalidator {
    pub fn new(settings: Arc<RowCacheSettings>) -> Self {
        Self { settings }
    }

    /// 失效一行或多行状态（例如更新前后的列值）对应的缓存键
    ///
    /// 实体未启用行缓存时不做任何事。返回删除的键数。
    #[instrument(skip(self, entity, rows), level = "debug", fields(entity = %entity.entity_type()))]
    pub async fn invalidate(&self, entity: &dyn Entity, rows: &[&Row]) -> Result<usize> {
        let Some(cacheable) = entity.as_row_cacheable() else {
            return Ok(0);
        };

        let mut keys = BTreeSet::new();
        for row in rows {
            for tuple in cacheable.invalidation_tuples(row)? {
                keys.insert(self.settings.key_for(cacheable, &tuple)?.into_string());
            }
        }
        if keys.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = keys.into_iter().collect();
        let store = cacheable.cache_store();
        store.delete_multiple(&keys).await?;
        debug!("invalidated {} keys in {}", keys.len(), store.name());
        GLOBAL_METRICS.record(entity.entity_type(), Outcome::Invalidated, keys.len());
        Ok(keys.len())
    }

    /// 存储写操作成功后调用
    ///
    /// 仅当实例在写操作之前已存在于存储中时才失效；插入新行无需失效。
    pub async fn after_mutation(
        &self,
        entity: &dyn Entity,
        existed_before: bool,
        before: &Row,
        after: &Row,
    ) -> Result<usize> {
        if !existed_before {
            return Ok(0);
        }
        if before == after {
            self.invalidate(entity, &[before]).await
        } else {
            self.invalidate(entity, &[before, after]).await
        }
    }
}
