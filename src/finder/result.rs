//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 批量查找结果：按实体类型分组的只读行集合。

use crate::value::Row;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    rows: BTreeMap<String, Vec<Row>>,
}

impl BatchResult {
    pub(crate) fn new(rows: BTreeMap<String, Vec<Row>>) -> Self {
        Self { rows }
    }

    /// 全部行数
    pub fn total_count(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// 某实体类型的行数
    pub fn count(&self, entity_type: &str) -> usize {
        self.rows.get(entity_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// 结果中是否包含该实体类型（即使没有任何行）
    pub fn has_entity(&self, entity_type: &str) -> bool {
        self.rows.contains_key(entity_type)
    }

    /// 该实体类型是否至少有一行
    pub fn has_rows(&self, entity_type: &str) -> bool {
        self.count(entity_type) > 0
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// 某实体类型的行
    pub fn rows(&self, entity_type: &str) -> &[Row] {
        self.rows.get(entity_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 展平遍历全部行
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows
            .iter()
            .flat_map(|(entity, rows)| rows.iter().map(move |row| (entity.as_str(), row)))
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<Row>> {
        self.rows
    }
}
