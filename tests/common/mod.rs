//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具：计数缓存后端、内存存储和示例实体。

#![allow(dead_code)]

use async_trait::async_trait;
use oxrowcache::backend::{CacheStore, MemoryStore, SharedStore};
use oxrowcache::entity::{primary_key_tuple, Entity, RowCacheable};
use oxrowcache::error::{CacheError, Result};
use oxrowcache::storage::{Predicate, RowQuery, RowStorage};
use oxrowcache::value::{Row, Tuple};
use oxrowcache::TtlWindow;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use oxrowcache::logging::setup_logging;

/// 记录批量调用次数的缓存后端
pub struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: AtomicUsize,
    deletes: AtomicUsize,
    pub ttls: Mutex<Vec<Option<Duration>>>,
    pub deleted_keys: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl CountingStore {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(name, 10_000),
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            ttls: Mutex::new(Vec::new()),
            deleted_keys: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn reset_counts(&self) {
        self.gets.store(0, Ordering::SeqCst);
        self.sets.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
        self.ttls.lock().unwrap().clear();
        self.deleted_keys.lock().unwrap().clear();
    }

    /// 下一次调用返回后端错误
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            Err(CacheError::Backend("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get_multiple(keys).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_multiple(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.ttls.lock().unwrap().push(ttl);
        self.check()?;
        self.inner.set_multiple(entries, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn delete_multiple(&self, keys: &[String]) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.deleted_keys.lock().unwrap().extend(keys.iter().cloned());
        self.check()?;
        self.inner.delete_multiple(keys).await
    }

    async fn has(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.has(key).await
    }
}

/// 内存关系存储，按谓词过滤行
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    selects: AtomicUsize,
    updates: AtomicUsize,
    pub queries: Mutex<Vec<(String, RowQuery)>>,
    pub update_predicates: Mutex<Vec<Vec<Predicate>>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RowStorage for MemoryStorage {
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .unwrap()
            .push((table.to_string(), query.clone()));
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.matches(row))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<()> {
        self.seed(table, vec![row.clone()]);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        assignments: &[(String, Value)],
        predicates: &[Predicate],
    ) -> Result<u64> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.update_predicates
            .lock()
            .unwrap()
            .push(predicates.to_vec());
        let mut tables = self.tables.lock().unwrap();
        let mut affected = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut() {
                if predicates.iter().all(|p| p.matches(row)) {
                    for (column, value) in assignments {
                        row.set(column.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !predicates.iter().all(|p| p.matches(row)));
        Ok((before - rows.len()) as u64)
    }
}

/// 用户：带乐观锁版本列，邮箱为第二个失效元组
pub struct Users {
    pub store: SharedStore,
    pub version: String,
}

impl Users {
    pub fn new(store: SharedStore) -> Arc<Self> {
        Self::versioned(store, "1")
    }

    pub fn versioned(store: SharedStore, version: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            version: version.to_string(),
        })
    }
}

impl Entity for Users {
    fn entity_type(&self) -> &str {
        "users"
    }

    fn table(&self) -> &str {
        "users"
    }

    fn version_column(&self) -> Option<&str> {
        Some("lock_version")
    }

    fn as_row_cacheable(&self) -> Option<&dyn RowCacheable> {
        Some(self)
    }
}

impl RowCacheable for Users {
    fn cache_version(&self) -> &str {
        &self.version
    }

    fn cache_store(&self) -> SharedStore {
        self.store.clone()
    }

    fn invalidation_tuples(&self, row: &Row) -> Result<Vec<Tuple>> {
        let mut tuples = vec![primary_key_tuple(self, row)?];
        if let Some(email) = row.get("email").filter(|v| !v.is_null()) {
            tuples.push(Tuple::key("email", email.clone()));
        }
        Ok(tuples)
    }
}

/// 文章：不启用乐观锁
pub struct Posts {
    pub store: SharedStore,
}

impl Posts {
    pub fn new(store: SharedStore) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

impl Entity for Posts {
    fn entity_type(&self) -> &str {
        "posts"
    }

    fn table(&self) -> &str {
        "posts"
    }

    fn as_row_cacheable(&self) -> Option<&dyn RowCacheable> {
        Some(self)
    }
}

impl RowCacheable for Posts {
    fn cache_store(&self) -> SharedStore {
        self.store.clone()
    }
}

/// 标签：禁用负缓存，固定 60 秒 TTL
pub struct Tags {
    pub store: SharedStore,
}

impl Tags {
    pub fn new(store: SharedStore) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

impl Entity for Tags {
    fn entity_type(&self) -> &str {
        "tags"
    }

    fn table(&self) -> &str {
        "tags"
    }

    fn as_row_cacheable(&self) -> Option<&dyn RowCacheable> {
        Some(self)
    }
}

impl RowCacheable for Tags {
    fn cache_ttl(&self) -> Option<TtlWindow> {
        Some(TtlWindow::fixed(Duration::from_secs(60)))
    }

    fn placeholder_sentinel(&self) -> Option<&str> {
        None
    }

    fn cache_store(&self) -> SharedStore {
        self.store.clone()
    }
}

/// 审计日志：不具备行缓存能力
pub struct AuditLog;

impl Entity for AuditLog {
    fn entity_type(&self) -> &str {
        "audit_log"
    }

    fn table(&self) -> &str {
        "audit_log"
    }
}

pub fn user(id: i64, name: &str, email: &str) -> Row {
    Row::from([
        ("id", json!(id)),
        ("name", json!(name)),
        ("email", json!(email)),
        ("lock_version", json!(1)),
    ])
}

pub fn post(id: i64, title: &str) -> Row {
    Row::from([("id", json!(id)), ("title", json!(title))])
}

pub fn tag(id: i64, label: &str) -> Row {
    Row::from([("id", json!(id)), ("label", json!(label))])
}

/// 预置 users 1、2，posts 10、11，tags 100
pub fn seeded_storage() -> Arc<MemoryStorage> {
    let storage = MemoryStorage::new();
    storage.seed(
        "users",
        vec![
            user(1, "alice", "alice@example.com"),
            user(2, "bob", "bob@example.com"),
        ],
    );
    storage.seed("posts", vec![post(10, "hello"), post(11, "world")]);
    storage.seed("tags", vec![tag(100, "rust")]);
    storage
}

/// 结果行的主键（升序）
pub fn ids(rows: &[Row]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect();
    ids.sort_unstable();
    ids
}

pub fn id_tuples(ids: &[i64]) -> Vec<Tuple> {
    ids.iter().map(|id| Tuple::key("id", *id)).collect()
}
