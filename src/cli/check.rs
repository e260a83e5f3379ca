//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了配置检查命令。

use super::CheckConfigArgs;
use crate::config::RowCacheConfig;
use anyhow::{Context, Result};

pub fn execute(args: &CheckConfigArgs) -> Result<()> {
    let config = RowCacheConfig::from_file(&args.path)
        .with_context(|| format!("Invalid configuration '{}'", args.path))?;

    println!("=== {} ===", args.path);
    println!("namespace:  {}", config.namespace);
    println!(
        "ttl window: {}s .. {}s",
        config.ttl.min_secs, config.ttl.max_secs
    );
    println!("compress:   {}", config.compress);
    match &config.redis {
        Some(redis) => println!("redis:      {:?}", redis.mode),
        None => println!("redis:      (not configured)"),
    }
    println!("\n✅ Configuration is valid");
    Ok(())
}
