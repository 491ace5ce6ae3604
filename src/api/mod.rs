// ==========================================
// 柔印制版生产管理系统 - API 层
// ==========================================
// 职责: 面向外部调用方（UI/接单系统）的业务门面
// 红线: 鉴权由外部协作方负责,本层只做业务校验
// ==========================================

pub mod error;
pub mod resource_api;
pub mod workflow_api;

// 重导出核心API
pub use error::{ApiError, ApiResult};
pub use resource_api::{ResourceApi, ResourceMetrics, ResourceStatusView};
pub use workflow_api::{OrderSummary, SubProcessUpdateOutcome, WorkflowApi};
