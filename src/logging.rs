// ==========================================
// 柔印制版生产管理系统 - 日志初始化
// ==========================================
// 基于 tracing / tracing-subscriber
// 级别由 RUST_LOG 环境变量控制
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=debug 或 RUST_LOG=flexo_plate_mes=trace
///
/// # 示例
/// ```no_run
/// use flexo_plate_mes::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化测试环境的日志系统（debug 级别,输出接入测试捕获）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
