//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了模型的写路径：插入、更新、删除，并在成功后触发缓存失效。

use crate::entity::Model;
use crate::error::{CacheError, Result};
use crate::invalidation::WriteInvalidator;
use crate::locking::{OptimisticLock, UpdateOutcome};
use crate::storage::{Predicate, RowStorage};
use std::sync::Arc;
use tracing::{debug, instrument};

/// 保存结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    Updated,
    /// 没有脏列，未发出语句也未失效
    Unchanged,
}

/// 模型写入器
#[derive(Clone)]
pub struct ModelWriter {
    storage: Arc<dyn RowStorage>,
    invalidator: WriteInvalidator,
}

impl ModelWriter {
    pub fn new(storage: Arc<dyn RowStorage>, invalidator: WriteInvalidator) -> Self {
        Self {
            storage,
            invalidator,
        }
    }

    /// 保存模型
    ///
    /// 新实例执行插入并初始化版本列；已存在的实例走乐观锁更新路径，
    /// 更新成功后失效更新前后两组列值对应的缓存键。
    #[instrument(skip(self, model), level = "debug", fields(entity = %model.entity().entity_type(), exists = model.exists()))]
    pub async fn save(&self, model: &mut Model) -> Result<SaveOutcome> {
        if !model.exists() {
            OptimisticLock::initialize(model);
            let entity = model.entity().clone();
            self.storage.insert(entity.table(), model.attributes()).await?;
            model.mark_persisted();
            debug!("inserted new {} row", entity.entity_type());
            return Ok(SaveOutcome::Inserted);
        }

        let before = model.original().clone();
        match OptimisticLock::update(self.storage.as_ref(), model).await? {
            UpdateOutcome::Unchanged => Ok(SaveOutcome::Unchanged),
            UpdateOutcome::Updated(_) => {
                let entity = model.entity().clone();
                self.invalidator
                    .after_mutation(entity.as_ref(), true, &before, model.attributes())
                    .await?;
                Ok(SaveOutcome::Updated)
            }
        }
    }

    /// 删除模型
    ///
    /// 实例不存在时返回 `false`，不发出语句。
    #[instrument(skip(self, model), level = "debug", fields(entity = %model.entity().entity_type()))]
    pub async fn delete(&self, model: &mut Model) -> Result<bool> {
        if !model.exists() {
            return Ok(false);
        }

        let entity = model.entity().clone();
        let primary_key = entity.primary_key_name();
        let key_value = model
            .original()
            .get(primary_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                CacheError::Configuration(format!(
                    "Cannot delete '{}' without a primary key value",
                    entity.entity_type()
                ))
            })?;

        let affected = self
            .storage
            .delete(entity.table(), &[Predicate::eq(primary_key, key_value)])
            .await?;
        debug!("deleted {} {} row(s)", affected, entity.entity_type());

        let before = model.original().clone();
        self.invalidator
            .after_mutation(entity.as_ref(), true, &before, &before)
            .await?;
        model.mark_deleted();
        Ok(true)
    }
}
