// ==========================================
// 柔印制版生产管理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单工艺流程引擎 + 洗版液资源台账
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 工艺模板与运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装与共享状态
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{OrderStatus, StageKind, StageStatus, SubProcessStatus};

// 领域实体
pub use domain::{
    LedgerSettingsPatch, MonthlyAggregate, OrderDraft, PlateDimensions, PrepressProgress,
    ProductionOrder, ResourceLedger, StageState, SubProcessState, UsageEvent,
    BARREL_CAPACITY_LITERS,
};

// 引擎
pub use engine::{
    AggregationReporter, ConsumptionEngine, GeometryCalculator, WorkflowError,
    WorkflowStateMachine,
};

// API
pub use api::{
    ApiError, ApiResult, OrderSummary, ResourceApi, ResourceStatusView, SubProcessUpdateOutcome,
    WorkflowApi,
};

// 配置
pub use config::{ConfigManager, WorkflowConfigReader};

// ==========================================
// 版本信息
// ==========================================

/// 库版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 数据库 schema 版本标识
pub const DB_VERSION: &str = "v0.1";
