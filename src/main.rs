// ==========================================
// 柔印制版生产管理系统 - 主入口
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单工艺流程引擎 + 洗版液资源台账
// ==========================================

use flexo_plate_mes::app::{get_default_db_path, AppState};
use flexo_plate_mes::logging;

#[tokio::main]
async fn main() {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("柔印制版生产管理系统");
    tracing::info!("系统版本: {}", flexo_plate_mes::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState（建表/植入台账,幂等）
    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };

    // 启动自检: 输出台账状态快照
    match app_state.resource_api.status().await {
        Ok(status) => {
            tracing::info!(
                "台账状态: 余量 {:.1}L / 容量 {:.1}L ({:.1}%), 本月记账订单 {} 单",
                status.current_liters,
                status.metrics.max_capacity_liters,
                status.metrics.fill_percentage,
                status.monthly_stats.orders_processed
            );
            match status.metrics.estimated_days_remaining {
                Some(days) => tracing::info!("预计可用天数: {:.1} 天", days),
                None => tracing::info!("预计可用天数: N/A（暂无消耗历史）"),
            }
        }
        Err(e) => {
            tracing::error!("台账状态读取失败: {}", e);
            std::process::exit(1);
        }
    }

    tracing::info!("初始化完成,等待外部调用方接入");
}
