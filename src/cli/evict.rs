//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了手动驱逐缓存条目的命令。

use super::EvictArgs;
use crate::backend::{CacheStore, RedisStore};
use crate::config::RowCacheConfig;
use anyhow::{anyhow, Context, Result};

pub async fn execute(args: &EvictArgs) -> Result<()> {
    let config = RowCacheConfig::from_file(&args.config)
        .with_context(|| format!("Invalid configuration '{}'", args.config))?;
    let redis = config
        .redis
        .as_ref()
        .ok_or_else(|| anyhow!("'{}' has no [redis] section", args.config))?;

    let key = args.key.cache_key(&config.namespace)?;
    let store = RedisStore::connect("cli", redis).await?;

    let existed = store.has(key.as_str()).await?;
    store.delete(key.as_str()).await?;
    if existed {
        println!("Evicted {}", key);
    } else {
        println!("No entry for {}", key);
    }
    Ok(())
}
