// ==========================================
// 柔印制版生产管理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::api::{ResourceApi, WorkflowApi};
use crate::config::ConfigManager;
use crate::db;
use crate::repository::{OrderRepository, ResourceLedgerRepository, UsageEventRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 工作流门面API
    pub workflow_api: Arc<WorkflowApi<ConfigManager>>,

    /// 台账API
    pub resource_api: Arc<ResourceApi<ConfigManager>>,

    /// 订单仓储（供外部接单系统直连查询）
    pub order_repo: Arc<OrderRepository>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库连接并应用统一 PRAGMA
    /// 2. 初始化全部表结构（幂等）并植入零库存台账
    /// 3. 初始化所有Repository与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        if let Ok(Some(version)) = db::read_schema_version(&conn) {
            if version != db::CURRENT_SCHEMA_VERSION {
                tracing::warn!(
                    "schema_version={} 与期望值 {} 不一致,请检查数据库",
                    version,
                    db::CURRENT_SCHEMA_VERSION
                );
            }
        }
        db::record_schema_version(&conn)
            .map_err(|e| format!("无法写入 schema_version: {}", e))?;

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        order_repo
            .ensure_schema()
            .map_err(|e| format!("无法初始化订单表: {}", e))?;

        let ledger_repo = Arc::new(ResourceLedgerRepository::new(conn.clone()));
        ledger_repo
            .ensure_schema()
            .map_err(|e| format!("无法初始化台账表: {}", e))?;

        let usage_repo = Arc::new(UsageEventRepository::new(conn.clone()));
        usage_repo
            .ensure_schema()
            .map_err(|e| format!("无法初始化记账事件表: {}", e))?;

        // ==========================================
        // 初始化配置层
        // ==========================================
        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        config
            .ensure_schema()
            .map_err(|e| format!("无法初始化配置表: {}", e))?;

        // ==========================================
        // 初始化API层
        // ==========================================
        let workflow_api = Arc::new(WorkflowApi::new(
            order_repo.clone(),
            ledger_repo.clone(),
            usage_repo.clone(),
            config.clone(),
        ));
        let resource_api = Arc::new(ResourceApi::new(
            ledger_repo.clone(),
            usage_repo.clone(),
            config.clone(),
        ));

        tracing::info!("AppState初始化成功");

        Ok(Self {
            db_path,
            workflow_api,
            resource_api,
            order_repo,
            config,
        })
    }
}

/// 获取默认数据库路径
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("FLEXO_PLATE_MES_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值，后续如果能拿到 data_dir 再覆盖
    let mut path = PathBuf::from("./flexo_plate_mes.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("flexo-plate-mes-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("flexo-plate-mes");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("flexo_plate_mes.db");
    }

    path.to_string_lossy().to_string()
}
