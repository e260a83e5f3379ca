//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存后端，支持单机和集群模式。

use super::CacheStore;
use crate::config::{RedisMode, RedisStoreConfig};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Redis缓存后端
#[derive(Clone)]
pub enum RedisStore {
    Standalone {
        name: String,
        manager: ConnectionManager,
    },
    Cluster {
        name: String,
        client: redis::cluster::ClusterClient,
    },
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone { name, .. } => write!(f, "RedisStore::Standalone({})", name),
            Self::Cluster { name, .. } => write!(f, "RedisStore::Cluster({})", name),
        }
    }
}

impl RedisStore {
    /// 根据配置建立连接
    ///
    /// # 参数
    ///
    /// * `name` - 后端名称
    /// * `config` - Redis 配置
    #[instrument(skip(config), level = "info", fields(mode = ?config.mode))]
    pub async fn connect(name: &str, config: &RedisStoreConfig) -> Result<Self> {
        config.validate()?;
        let name = name.to_string();
        match config.mode {
            RedisMode::Standalone => {
                let secret = config.connection_string.expose_secret();
                let connection_string = if config.enable_tls && !secret.starts_with("rediss://") {
                    secret.replace("redis://", "rediss://")
                } else {
                    secret.to_string()
                };

                let client = Client::open(connection_string.as_str())?;
                let manager = match timeout(
                    Duration::from_millis(config.connection_timeout_ms),
                    client.get_connection_manager(),
                )
                .await
                {
                    Ok(res) => res?,
                    Err(_) => {
                        return Err(CacheError::Backend(format!(
                            "Connection timed out after {}ms",
                            config.connection_timeout_ms
                        )));
                    }
                };
                debug!("RedisStore {} connected (standalone)", name);
                Ok(RedisStore::Standalone { name, manager })
            }
            RedisMode::Cluster => {
                let mut builder = redis::cluster::ClusterClient::builder(config.nodes.clone());
                if let Some(password) = &config.password {
                    builder = builder.password(password.expose_secret().to_string());
                }
                let client = builder.build()?;
                debug!("RedisStore {} configured (cluster)", name);
                Ok(RedisStore::Cluster { name, client })
            }
        }
    }

    fn set_command(pipe: &mut redis::Pipeline, key: &str, value: &[u8], ttl: Option<Duration>) {
        match ttl {
            Some(ttl) => {
                // EX 不接受 0 秒
                let secs = ttl.as_secs().max(1);
                pipe.cmd("SET").arg(key).arg(value).arg("EX").arg(secs).ignore();
            }
            None => {
                pipe.cmd("SET").arg(key).arg(value).ignore();
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &str {
        match self {
            RedisStore::Standalone { name, .. } | RedisStore::Cluster { name, .. } => name,
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = match self {
            RedisStore::Standalone { manager, .. } => {
                let mut conn = manager.clone();
                redis::cmd("GET").arg(key).query_async(&mut conn).await?
            }
            RedisStore::Cluster { client, .. } => {
                let mut conn = client.get_async_connection().await?;
                redis::cmd("GET").arg(key).query_async(&mut conn).await?
            }
        };
        Ok(value)
    }

    #[instrument(skip(self, keys), level = "debug", fields(count = keys.len()))]
    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let values: Vec<Option<Vec<u8>>> = match self {
            RedisStore::Standalone { manager, .. } => {
                let mut conn = manager.clone();
                redis::cmd("MGET").arg(keys).query_async(&mut conn).await?
            }
            RedisStore::Cluster { client, .. } => {
                // 集群中键可能落在不同槽位，改用逐键 GET 的流水线
                let mut conn = client.get_async_connection().await?;
                let mut pipe = redis::pipe();
                for key in keys {
                    pipe.cmd("GET").arg(key);
                }
                pipe.query_async(&mut conn).await?
            }
        };

        let found: HashMap<String, Vec<u8>> = keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|v| (key.clone(), v)))
            .collect();
        debug!("redis get_multiple: requested={}, found={}", keys.len(), found.len());
        Ok(found)
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.set_multiple(vec![(key.to_string(), value)], ttl).await
    }

    #[instrument(skip(self, entries), level = "debug", fields(count = entries.len()))]
    async fn set_multiple(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for (key, value) in &entries {
            Self::set_command(&mut pipe, key, value, ttl);
        }
        match self {
            RedisStore::Standalone { manager, .. } => {
                pipe.query_async::<()>(&mut manager.clone()).await?;
            }
            RedisStore::Cluster { client, .. } => {
                pipe.query_async::<()>(&mut client.get_async_connection().await?)
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_multiple(&[key.to_string()]).await
    }

    #[instrument(skip(self, keys), level = "debug", fields(count = keys.len()))]
    async fn delete_multiple(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("DEL").arg(key).ignore();
        }
        match self {
            RedisStore::Standalone { manager, .. } => {
                pipe.query_async::<()>(&mut manager.clone()).await?;
            }
            RedisStore::Cluster { client, .. } => {
                pipe.query_async::<()>(&mut client.get_async_connection().await?)
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn has(&self, key: &str) -> Result<bool> {
        let exists: bool = match self {
            RedisStore::Standalone { manager, .. } => {
                let mut conn = manager.clone();
                redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?
            }
            RedisStore::Cluster { client, .. } => {
                let mut conn = client.get_async_connection().await?;
                redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?
            }
        };
        Ok(exists)
    }
}
