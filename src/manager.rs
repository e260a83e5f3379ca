//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了行缓存管理器，负责持有共享设置与存储，并创建查找器和写入器。

use crate::config::RowCacheConfig;
use crate::entity::Entity;
use crate::error::Result;
use crate::finder::{CrossEntityBatchFinder, RowCacheSettings, SingleEntityRowFinder};
use crate::invalidation::WriteInvalidator;
use crate::persist::ModelWriter;
use crate::storage::RowStorage;
use std::sync::Arc;
use tracing::{info, instrument};

/// 行缓存管理器
///
/// 不持有任何进程级全局状态；缓存后端由各实体自行提供。
#[derive(Clone)]
pub struct RowCacheManager {
    storage: Arc<dyn RowStorage>,
    settings: Arc<RowCacheSettings>,
}

impl RowCacheManager {
    /// 根据配置创建管理器
    #[instrument(skip(config, storage), level = "info", fields(namespace = %config.namespace))]
    pub fn new(config: &RowCacheConfig, storage: Arc<dyn RowStorage>) -> Result<Self> {
        config.validate()?;
        info!(
            "Initializing RowCacheManager (ttl {}s..{}s, compress={})",
            config.ttl.min_secs, config.ttl.max_secs, config.compress
        );
        Ok(Self {
            storage,
            settings: Arc::new(RowCacheSettings::from_config(config)),
        })
    }

    pub fn settings(&self) -> &Arc<RowCacheSettings> {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn RowStorage> {
        &self.storage
    }

    /// 单实体查找器，实体缺少行缓存能力时返回配置错误
    pub fn finder(&self, entity: Arc<dyn Entity>) -> Result<SingleEntityRowFinder> {
        SingleEntityRowFinder::new(entity, self.storage.clone(), self.settings.clone())
    }

    pub fn batch_finder(&self) -> CrossEntityBatchFinder {
        CrossEntityBatchFinder::new(self.storage.clone(), self.settings.clone())
    }

    pub fn invalidator(&self) -> WriteInvalidator {
        WriteInvalidator::new(self.settings.clone())
    }

    pub fn writer(&self) -> ModelWriter {
        ModelWriter::new(self.storage.clone(), self.invalidator())
    }
}
