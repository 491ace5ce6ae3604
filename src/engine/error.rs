// ==========================================
// 柔印制版生产管理系统 - 引擎层错误类型
// ==========================================
// 职责: 业务规则校验失败的统一错误口径
// 红线: 校验失败同步拒绝,不得部分生效
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 工作流/台账业务规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    // ===== 几何与数量校验 =====
    #[error("版材几何参数无效: {0}")]
    InvalidGeometry(String),

    #[error("补液数量无效: barrel_count={0}, 必须为正整数")]
    InvalidQuantity(i64),

    #[error("台账参数无效 (field={field}): {message}")]
    InvalidSetting { field: String, message: String },

    // ===== 耗液记账 =====
    #[error("耗液重复记账: order_id={0} 已存在记账事件")]
    DuplicateUsage(String),

    /// 软性错误: 记账仍然落账,余量转负,仅向上层提示
    #[error("洗版液余量不足: 当前 {current_liters:.1}L, 本次需求 {required_liters:.1}L")]
    InsufficientInventory {
        current_liters: f64,
        required_liters: f64,
    },

    // ===== 工艺流程 =====
    #[error("未知子工序: {code} (模板 {template_id} 未配置)")]
    UnknownSubProcess { code: String, template_id: String },

    #[error("非法状态转换: from={from} to={to}")]
    IllegalTransition { from: String, to: String },

    #[error("制版工序未全部完成: {0}")]
    PrepressIncomplete(String),
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
