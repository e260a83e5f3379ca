//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了关系存储协作方的接口：按列谓词的合取查询和基本写操作。

pub mod sea_orm_storage;

use crate::error::Result;
use crate::value::{canonical_scalar, Row};
use async_trait::async_trait;
use serde_json::Value;

pub use sea_orm_storage::SeaOrmStorage;

/// 单列谓词
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column = value`
    Eq { column: String, value: Value },
    /// `column IN (values...)`
    In { column: String, values: Vec<Value> },
    /// `column IS NULL`
    IsNull { column: String },
    /// `column IN (values...) OR column IS NULL`
    InOrNull { column: String, values: Vec<Value> },
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column }
            | Predicate::InOrNull { column, .. } => column,
        }
    }

    /// 对行求值，按规范字符串比较标量
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column()).and_then(canonical_scalar);
        let contains = |values: &[Value]| {
            cell.as_ref()
                .is_some_and(|c| values.iter().any(|v| canonical_scalar(v).as_ref() == Some(c)))
        };
        match self {
            Predicate::Eq { value, .. } => {
                cell.is_some() && cell == canonical_scalar(value)
            }
            Predicate::In { values, .. } => contains(values),
            Predicate::IsNull { .. } => cell.is_none(),
            Predicate::InOrNull { values, .. } => cell.is_none() || contains(values),
        }
    }
}

/// 行查询：谓词合取与结果数上限
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowQuery {
    pub predicates: Vec<Predicate>,
    pub limit: Option<u64>,
}

impl RowQuery {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self {
            predicates,
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

/// 关系存储接口
///
/// 不要求结果有序，缓存层自行对结果重新计算键。
#[async_trait]
pub trait RowStorage: Send + Sync {
    async fn select(&self, table: &str, query: &RowQuery) -> Result<Vec<Row>>;

    async fn insert(&self, table: &str, row: &Row) -> Result<()>;

    /// 返回受影响的行数
    async fn update(
        &self,
        table: &str,
        assignments: &[(String, Value)],
        predicates: &[Predicate],
    ) -> Result<u64>;

    /// 返回受影响的行数
    async fn delete(&self, table: &str, predicates: &[Predicate]) -> Result<u64>;
}
