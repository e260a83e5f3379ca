//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 日志初始化工具，供二进制程序、测试和基准共用。

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 安装全局 fmt subscriber
///
/// 优先读取 `RUST_LOG`，未设置时使用 `default_filter`。重复调用无副作用。
pub fn init_logging(default_filter: &str) {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(filter)
            .try_init()
            .ok();
    });
}

/// 以 debug 级别初始化日志
pub fn setup_logging() {
    init_logging("debug");
}
