//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存键计算命令。

use crate::config::DEFAULT_NAMESPACE;
use crate::key::{build_cache_key, canonical_form, CacheKey};
use crate::value::Tuple;
use anyhow::{anyhow, Result};
use clap::Parser;
use serde_json::Value;

#[derive(Parser, Debug, Clone)]
pub struct KeyArgs {
    #[arg(short, long, help = "Entity type identifier")]
    pub entity: String,

    #[arg(long, default_value = "1", help = "Cache version of the entity")]
    pub cache_version: String,

    #[arg(long, default_value = "id", help = "Primary key column name")]
    pub primary_key: String,

    #[arg(long, help = "Key namespace (defaults to the configured or built-in one)")]
    pub namespace: Option<String>,

    #[arg(required = true, help = "Tuple columns as column=value; values are parsed as JSON when possible")]
    pub columns: Vec<String>,
}

impl KeyArgs {
    pub fn tuple(&self) -> Result<Tuple> {
        let mut tuple = Tuple::new();
        for pair in &self.columns {
            let (column, value) = parse_column_pair(pair)?;
            tuple.insert(column, value);
        }
        Ok(tuple)
    }

    pub fn cache_key(&self, default_namespace: &str) -> Result<CacheKey> {
        let namespace = self.namespace.as_deref().unwrap_or(default_namespace);
        Ok(build_cache_key(
            namespace,
            &self.entity,
            &self.primary_key,
            &self.tuple()?,
            &self.cache_version,
        )?)
    }
}

/// 解析 `column=value`
pub fn parse_column_pair(pair: &str) -> Result<(String, Value)> {
    let (column, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected column=value, got '{}'", pair))?;
    if column.is_empty() {
        return Err(anyhow!("Empty column name in '{}'", pair));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((column.to_string(), value))
}

pub fn execute(args: &KeyArgs) -> Result<()> {
    let tuple = args.tuple()?;
    let canonical = canonical_form(
        &args.entity,
        &args.primary_key,
        &tuple,
        &args.cache_version,
    )?;
    println!("canonical: {}", canonical);
    println!("key:       {}", args.cache_key(DEFAULT_NAMESPACE)?);
    Ok(())
}
