// ==========================================
// 柔印制版生产管理系统 - 配置层
// ==========================================
// 职责: 工艺模板、记账触发、报表窗口等运行参数
// 存储: config_scope / config_kv 表
// ==========================================

pub mod config_manager;
pub mod workflow_config_trait;

pub use config_manager::{ConfigManager, DEFAULT_TEMPLATE_ID, STANDARD_SUB_PROCESSES};
pub use workflow_config_trait::{ConfigError, WorkflowConfigReader};
