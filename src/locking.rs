//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 乐观锁
//!
//! 通过版本列上的条件 UPDATE 在存储层完成比较并交换：
//! `UPDATE ... SET <脏列>, version = v + 1 WHERE pk = ? AND version = v`。
//! 受影响行数为 0 时返回 [`CacheError::OptimisticLockFailure`]，内存中的版本号保持不变。

use crate::entity::Model;
use crate::error::{CacheError, Result};
use crate::storage::{Predicate, RowStorage};
use crate::value::canonical_scalar;
use serde_json::Value;
use tracing::{debug, instrument};

/// 实例的版本状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionState {
    /// 版本列为空
    Unversioned,
    Versioned(i64),
}

impl VersionState {
    /// 读取模型最近一次同步时的版本
    pub fn of(model: &Model) -> Result<Self> {
        let Some(column) = model.entity().version_column() else {
            return Ok(VersionState::Unversioned);
        };
        Self::parse(column, model.original().get(column))
    }

    fn parse(column: &str, value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(VersionState::Unversioned),
            Some(Value::Number(n)) => n.as_i64().map(VersionState::Versioned).ok_or_else(|| {
                CacheError::Configuration(format!("Version column '{}' is not an integer", column))
            }),
            Some(Value::String(s)) => s.parse().map(VersionState::Versioned).map_err(|_| {
                CacheError::Configuration(format!("Version column '{}' is not an integer", column))
            }),
            Some(_) => Err(CacheError::Configuration(format!(
                "Version column '{}' is not an integer",
                column
            ))),
        }
    }

    /// 下一个版本号
    pub fn next(&self) -> i64 {
        match self {
            VersionState::Unversioned => 1,
            VersionState::Versioned(v) => v + 1,
        }
    }

    fn guard(&self, column: &str) -> Predicate {
        match self {
            VersionState::Unversioned => Predicate::IsNull {
                column: column.to_string(),
            },
            VersionState::Versioned(v) => Predicate::eq(column, *v),
        }
    }
}

/// 更新结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 没有脏列，未发出任何语句
    Unchanged,
    /// 更新成功，携带受影响行数
    Updated(u64),
}

/// 乐观锁更新路径
pub struct OptimisticLock;

impl OptimisticLock {
    /// 新建实例时初始化版本列
    pub fn initialize(model: &mut Model) {
        if let Some(column) = model.entity().version_column() {
            let unset = model.get(column).map_or(true, Value::is_null);
            if unset {
                let column = column.to_string();
                model.set(column, 1);
            }
        }
    }

    /// 更新已存在的实例
    ///
    /// 未配置版本列时执行无条件更新。成功后同步 `original`。
    #[instrument(skip(storage, model), level = "debug", fields(entity = %model.entity().entity_type()))]
    pub async fn update(storage: &dyn RowStorage, model: &mut Model) -> Result<UpdateOutcome> {
        let mut assignments = model.dirty();
        if assignments.is_empty() {
            debug!("no dirty columns, skipping update");
            return Ok(UpdateOutcome::Unchanged);
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
                    "Cannot update '{}' without a primary key value",
                    entity.entity_type()
                ))
            })?;

        let mut predicates = vec![Predicate::eq(primary_key, key_value.clone())];
        let mut bumped = None;
        if let Some(column) = entity.version_column() {
            let state = VersionState::of(model)?;
            let next = state.next();
            assignments.push((column.to_string(), Value::from(next)));
            predicates.push(state.guard(column));
            bumped = Some((column, state, next));
        }

        let affected = storage
            .update(entity.table(), &assignments, &predicates)
            .await?;

        if let Some((column, state, next)) = bumped {
            if affected == 0 {
                return Err(CacheError::OptimisticLockFailure {
                    entity: entity.entity_type().to_string(),
                    primary_key: canonical_scalar(&key_value).unwrap_or_default(),
                    expected_version: match state {
                        VersionState::Unversioned => 0,
                        VersionState::Versioned(v) => v,
                    },
                });
            }
            model.set(column, next);
        }

        model.mark_persisted();
        Ok(UpdateOutcome::Updated(affected))
    }
}
