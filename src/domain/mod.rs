// ==========================================
// 柔印制版生产管理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod ledger;
pub mod order;
pub mod types;

// 重导出核心类型
pub use ledger::{
    LedgerSettingsPatch, MonthlyAggregate, ResourceLedger, UsageEvent,
    BARREL_CAPACITY_LITERS, LEDGER_ID,
};
pub use order::{
    OrderDraft, PlateDimensions, PrepressProgress, ProductionOrder, StageState, SubProcessState,
};
pub use types::{OrderStatus, StageKind, StageStatus, SubProcessStatus};
