//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 写路径集成测试：写后失效与乐观锁

#[path = "../common/mod.rs"]
mod common;

use common::{
    post, seeded_storage, setup_logging, user, AuditLog, CountingStore, MemoryStorage, Posts,
    Users,
};
use oxrowcache::entity::Model;
use oxrowcache::error::CacheError;
use oxrowcache::persist::SaveOutcome;
use oxrowcache::storage::Predicate;
use oxrowcache::value::{Row, Tuple};
use oxrowcache::{RowCacheConfig, RowCacheManager};
use serde_json::json;
use std::sync::Arc;

fn manager(storage: Arc<MemoryStorage>) -> RowCacheManager {
    RowCacheManager::new(&RowCacheConfig::default(), storage).unwrap()
}

fn stored_row(storage: &MemoryStorage, table: &str, id: i64) -> Row {
    storage
        .rows(table)
        .into_iter()
        .find(|row| row.get("id") == Some(&json!(id)))
        .unwrap()
}

/// 测试更新后再次查找返回新值
#[tokio::test]
async fn test_update_invalidates_cached_row() {
    setup_logging();
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    storage.seed("users", vec![user(5, "eve", "eve@example.com")]);
    let manager = manager(storage.clone());
    let users = Users::new(store.clone());
    let finder = manager.finder(users.clone()).unwrap();

    let cached = finder.find_by_key(5).await.unwrap().unwrap();
    assert_eq!(cached.get("name"), Some(&json!("eve")));

    let mut model = Model::from_storage(users, cached);
    model.set("name", "eve2");
    let outcome = manager.writer().save(&mut model).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Updated);
    assert_eq!(model.get("lock_version"), Some(&json!(2)));
    assert!(!model.is_dirty());

    let fresh = finder.find_by_key(5).await.unwrap().unwrap();
    assert_eq!(fresh.get("name"), Some(&json!("eve2")));
    assert_eq!(fresh.get("lock_version"), Some(&json!(2)));
    assert_eq!(storage.selects(), 2);
}

/// 测试没有脏列时不发出语句也不失效
#[tokio::test]
async fn test_clean_save_is_a_no_op() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());
    let users = Users::new(store.clone());

    let mut model = Model::from_storage(users, stored_row(&storage, "users", 1));
    // 赋相同的值不算脏列
    model.set("name", "alice");
    let outcome = manager.writer().save(&mut model).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Unchanged);
    assert_eq!(storage.updates(), 0);
    assert_eq!(store.deletes(), 0);
}

/// 测试乐观锁：并发修改同一行时后提交者失败
#[tokio::test]
async fn test_concurrent_update_fails_optimistic_lock() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());
    let writer = manager.writer();
    let users = Users::new(store.clone());
    let row = stored_row(&storage, "users", 1);

    let mut first = Model::from_storage(users.clone(), row.clone());
    let mut second = Model::from_storage(users, row);

    first.set("name", "first");
    writer.save(&mut first).await.unwrap();

    second.set("name", "second");
    let err = writer.save(&mut second).await.unwrap_err();
    assert!(err.is_optimistic_lock_failure());
    match err {
        CacheError::OptimisticLockFailure {
            entity,
            primary_key,
            expected_version,
        } => {
            assert_eq!(entity, "users");
            assert_eq!(primary_key, "1");
            assert_eq!(expected_version, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    // 失败方的内存版本保持不变，存储保留先提交者的值
    assert_eq!(second.get("lock_version"), Some(&json!(1)));
    assert!(second.is_dirty());
    let stored = stored_row(&storage, "users", 1);
    assert_eq!(stored.get("name"), Some(&json!("first")));
    assert_eq!(stored.get("lock_version"), Some(&json!(2)));
    // 只有成功的写入触发失效
    assert_eq!(store.deletes(), 1);
}

/// 测试更新语句带主键与版本守卫
#[tokio::test]
async fn test_update_guards_on_version() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());

    let mut model = Model::from_storage(Users::new(store), stored_row(&storage, "users", 2));
    model.set("name", "robert");
    manager.writer().save(&mut model).await.unwrap();

    let predicates = storage.update_predicates.lock().unwrap().clone();
    assert_eq!(
        predicates,
        vec![vec![Predicate::eq("id", 2), Predicate::eq("lock_version", 1)]]
    );
}

/// 测试版本列为空的行首次更新时以 IS NULL 为守卫并置为 1
#[tokio::test]
async fn test_unversioned_row_gets_first_version() {
    let store = CountingStore::new("users");
    let storage = MemoryStorage::new();
    storage.seed(
        "users",
        vec![Row::from([
            ("id", json!(8)),
            ("name", json!("legacy")),
            ("email", json!("legacy@example.com")),
            ("lock_version", json!(null)),
        ])],
    );
    let manager = manager(storage.clone());

    let mut model = Model::from_storage(Users::new(store), stored_row(&storage, "users", 8));
    model.set("name", "migrated");
    manager.writer().save(&mut model).await.unwrap();

    let predicates = storage.update_predicates.lock().unwrap().clone();
    assert_eq!(
        predicates[0][1],
        Predicate::IsNull {
            column: "lock_version".to_string()
        }
    );
    assert_eq!(model.get("lock_version"), Some(&json!(1)));
    assert_eq!(
        stored_row(&storage, "users", 8).get("lock_version"),
        Some(&json!(1))
    );
}

/// 测试未启用乐观锁的实体执行无条件更新
#[tokio::test]
async fn test_unlocked_entity_updates_without_guard() {
    let store = CountingStore::new("posts");
    let storage = seeded_storage();
    let manager = manager(storage.clone());

    let mut model = Model::from_storage(Posts::new(store.clone()), post(10, "hello"));
    model.set("title", "hello again");
    let outcome = manager.writer().save(&mut model).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Updated);
    let predicates = storage.update_predicates.lock().unwrap().clone();
    assert_eq!(predicates, vec![vec![Predicate::eq("id", 10)]]);
    assert_eq!(store.deletes(), 1);
}

/// 测试插入新行时初始化版本且不触发失效
#[tokio::test]
async fn test_insert_initializes_version() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());

    let row = Row::from([
        ("id", json!(3)),
        ("name", json!("carol")),
        ("email", json!("carol@example.com")),
    ]);
    let mut model = Model::new(Users::new(store.clone()), row);
    let outcome = manager.writer().save(&mut model).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Inserted);
    assert!(model.exists());
    assert_eq!(model.get("lock_version"), Some(&json!(1)));
    assert_eq!(store.deletes(), 0);
    assert_eq!(
        stored_row(&storage, "users", 3).get("lock_version"),
        Some(&json!(1))
    );
}

/// 测试插入不会清除已有的负缓存，需显式失效
#[tokio::test]
async fn test_insert_keeps_placeholder_until_invalidated() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());
    let users = Users::new(store.clone());
    let finder = manager.finder(users.clone()).unwrap();

    assert!(finder.find_by_key(3).await.unwrap().is_none());

    let row = user(3, "carol", "carol@example.com");
    let mut model = Model::new(users.clone(), row);
    manager.writer().save(&mut model).await.unwrap();
    assert!(finder.find_by_key(3).await.unwrap().is_none());

    let removed = manager
        .invalidator()
        .invalidate(users.as_ref(), &[model.attributes()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
    let found = finder.find_by_key(3).await.unwrap().unwrap();
    assert_eq!(found.get("name"), Some(&json!("carol")));
}

/// 测试删除后再次查找得到空结果
#[tokio::test]
async fn test_delete_invalidates_cached_row() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());
    let users = Users::new(store.clone());
    let finder = manager.finder(users.clone()).unwrap();

    let cached = finder.find_by_key(1).await.unwrap().unwrap();
    let mut model = Model::from_storage(users, cached);
    assert!(manager.writer().delete(&mut model).await.unwrap());
    assert!(!model.exists());
    assert_eq!(store.deletes(), 1);

    assert!(finder.find_by_key(1).await.unwrap().is_none());
    assert_eq!(storage.selects(), 2);
    assert!(storage.rows("users").iter().all(|r| r.get("id") != Some(&json!(1))));

    // 已删除的实例再次删除不发出语句
    assert!(!manager.writer().delete(&mut model).await.unwrap());
    assert_eq!(store.deletes(), 1);
}

/// 测试修改唯一列时新旧两组列值都被失效
#[tokio::test]
async fn test_secondary_unique_tuple_is_invalidated() {
    let store = CountingStore::new("users");
    let storage = seeded_storage();
    let manager = manager(storage.clone());
    let users = Users::new(store.clone());
    let finder = manager.finder(users.clone()).unwrap();

    let old_email = Tuple::key("email", "bob@example.com");
    let new_email = Tuple::key("email", "bobby@example.com");
    let cached = finder.find_one(old_email.clone()).await.unwrap().unwrap();
    // 新邮箱此时写入占位符
    assert!(finder.find_one(new_email.clone()).await.unwrap().is_none());

    let mut model = Model::from_storage(users, cached);
    model.set("email", "bobby@example.com");
    manager.writer().save(&mut model).await.unwrap();

    // 主键、旧邮箱、新邮箱
    assert_eq!(store.deleted_keys.lock().unwrap().len(), 3);
    assert!(finder.find_one(old_email).await.unwrap().is_none());
    let found = finder.find_one(new_email).await.unwrap().unwrap();
    assert_eq!(found.get("id"), Some(&json!(2)));
}

/// 测试不具备行缓存能力的实体写入后不访问缓存
#[tokio::test]
async fn test_non_cacheable_entity_skips_invalidation() {
    let storage = MemoryStorage::new();
    storage.seed("audit_log", vec![Row::from([("id", json!(1)), ("action", json!("login"))])]);
    let manager = manager(storage.clone());

    let mut model = Model::from_storage(
        Arc::new(AuditLog),
        Row::from([("id", json!(1)), ("action", json!("login"))]),
    );
    model.set("action", "logout");
    let outcome = manager.writer().save(&mut model).await.unwrap();
    assert_eq!(outcome, SaveOutcome::Updated);

    let removed = manager
        .invalidator()
        .invalidate(&AuditLog, &[model.attributes()])
        .await
        .unwrap();
    assert_eq!(removed, 0);
}

/// 测试缺少主键的实例无法更新
#[tokio::test]
async fn test_update_without_primary_key_is_rejected() {
    let store = CountingStore::new("posts");
    let storage = seeded_storage();
    let manager = manager(storage.clone());

    let mut model = Model::from_storage(
        Posts::new(store),
        Row::from([("title", json!("orphan"))]),
    );
    model.set("title", "still orphan");
    let err = manager.writer().save(&mut model).await.unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(storage.updates(), 0);
}
