//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了元组（唯一键列值映射）与行数据的表示。

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;

/// 元组：列名到标量值的映射，唯一标识某实体的至多一行
///
/// 内部使用有序映射，因此列的插入顺序不影响比较与缓存键。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple(BTreeMap<String, Value>);

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以主键构造元组
    pub fn key(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().with(column, value)
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// 列名集合
    pub fn columns(&self) -> BTreeSet<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// 将纯数字列名替换为主键列名，并拒绝非标量值
    ///
    /// 替换后与已有列重名（例如同时给出 `"0"` 和主键列）时返回配置错误。
    pub fn normalized(&self, primary_key: &str) -> Result<Tuple> {
        let mut out = BTreeMap::new();
        for (column, value) in &self.0 {
            ensure_scalar(column, value)?;
            let target = if is_positional(column) {
                primary_key.to_string()
            } else {
                column.clone()
            };
            if out.insert(target, value.clone()).is_some() {
                return Err(CacheError::Configuration(format!(
                    "Positional column '{}' collides with primary key column '{}'",
                    column, primary_key
                )));
            }
        }
        Ok(Tuple(out))
    }

    /// 从行中按给定列重新提取元组，缺失的列视为 null
    pub fn from_row<'a>(row: &Row, columns: impl IntoIterator<Item = &'a str>) -> Tuple {
        let mut out = BTreeMap::new();
        for column in columns {
            let value = row.get(column).cloned().unwrap_or(Value::Null);
            out.insert(column.to_string(), value);
        }
        Tuple(out)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Tuple {
    fn from(entries: [(K, V); N]) -> Self {
        Tuple(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Tuple {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Tuple(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// 行数据：存储层返回的实体列值
///
/// 核心逻辑只从中提取重建元组所需的列。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Row {
    fn from(entries: [(K, V); N]) -> Self {
        Row(entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

impl From<BTreeMap<String, Value>> for Row {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Row(map)
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

/// 列名是否为纯数字（位置参数，指代主键）
fn is_positional(column: &str) -> bool {
    !column.is_empty() && column.bytes().all(|b| b.is_ascii_digit())
}

/// 拒绝数组和对象
pub fn ensure_scalar(column: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(_) | Value::Object(_) => Err(CacheError::Configuration(format!(
            "Column '{}' has a non-scalar value",
            column
        ))),
        _ => Ok(()),
    }
}

/// 标量的规范字符串形式，null 返回 None
///
/// 数字按 JSON 文本输出，因此 `5` 与 `"5"` 等价；布尔值输出为 `"1"`/`"0"`。
pub fn canonical_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
