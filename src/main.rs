//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 行缓存运维工具入口。

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    oxrowcache::cli::run().await
}
