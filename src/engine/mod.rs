// ==========================================
// 柔印制版生产管理系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不写库, 所有规则必须输出 reason
// ==========================================

pub mod consumption;
pub mod error;
pub mod geometry;
pub mod reporter;
pub mod state_machine;

// 重导出核心引擎
pub use consumption::{ConsumptionEngine, UsagePlan};
pub use error::{WorkflowError, WorkflowResult};
pub use geometry::GeometryCalculator;
pub use reporter::AggregationReporter;
pub use state_machine::WorkflowStateMachine;
