//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了行缓存的查找与失效计数。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 计数结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 缓存命中行数据
    Hit,
    /// 命中负缓存占位符
    Negative,
    /// 未命中，需要回源
    Miss,
    /// 回源后写入缓存的行
    Stored,
    /// 回源后写入缓存的占位符
    Placeholder,
    /// 写操作后删除的键
    Invalidated,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Hit => "hit",
            Outcome::Negative => "negative",
            Outcome::Miss => "miss",
            Outcome::Stored => "stored",
            Outcome::Placeholder => "placeholder",
            Outcome::Invalidated => "invalidated",
        }
    }
}

/// 指标收集器
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// key: "entity:outcome"
    pub counters: Arc<Mutex<HashMap<String, u64>>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    pub fn record(&self, entity: &str, outcome: Outcome, count: usize) {
        if count == 0 {
            return;
        }
        let key = format!("{}:{}", entity, outcome.as_str());
        // 计数器在锁中毒后仍可继续使用
        let mut map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        *map.entry(key).or_insert(0) += count as u64;
    }

    pub fn get(&self, entity: &str, outcome: Outcome) -> u64 {
        let key = format!("{}:{}", entity, outcome.as_str());
        let map = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&key).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn reset(&self) {
        self.counters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// 命中率（行命中与负缓存命中都计为命中）
    pub fn hit_ratio(&self, entity: &str) -> Option<f64> {
        let hits = self.get(entity, Outcome::Hit) + self.get(entity, Outcome::Negative);
        let total = hits + self.get(entity, Outcome::Miss);
        if total == 0 {
            None
        } else {
            Some(hits as f64 / total as f64)
        }
    }
}
