// ==========================================
// 柔印制版生产管理系统 - 洗版液台账领域模型
// ==========================================
// 对齐: resource_ledger（单行表）/ usage_event 表
// 红线: 台账只经由 ResourceApi 变更; usage_event 只增不改
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 单桶容量（升）
pub const BARREL_CAPACITY_LITERS: f64 = 200.0;

/// 台账固定主键（每站点单实例）
pub const LEDGER_ID: &str = "main";

// ==========================================
// ResourceLedger - 洗版液台账
// ==========================================
// 单行表 + revision 乐观锁,补液/记账/参数变更全部串行化
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLedger {
    pub ledger_id: String,               // 固定为 "main"

    // ===== 库存 =====
    pub total_barrels: i64,              // 累计入库桶数
    pub current_liters: f64,             // 当前余量（升,记账可暂为负,见 InsufficientInventory）

    // ===== 成本/消耗参数 =====
    pub cost_per_barrel: f64,            // 每桶采购成本
    pub recycling_cost_per_barrel: f64,  // 每桶回收处理成本
    pub cost_per_square_meter: f64,      // 每平米计费成本
    pub liters_per_square_meter: f64,    // 每平米耗液量（升）
    pub recycling_rate: f64,             // 回收率 [0,1]

    // ===== 并发控制 =====
    pub revision: i32,                   // 乐观锁修订号

    // ===== 审计字段 =====
    pub updated_at: DateTime<Utc>,       // 最后更新时间
}

impl ResourceLedger {
    /// 创建零库存初始台账（系统引导时调用一次）
    pub fn bootstrap(now: DateTime<Utc>) -> Self {
        Self {
            ledger_id: LEDGER_ID.to_string(),
            total_barrels: 0,
            current_liters: 0.0,
            cost_per_barrel: 0.0,
            recycling_cost_per_barrel: 0.0,
            cost_per_square_meter: 0.0,
            liters_per_square_meter: 0.0,
            recycling_rate: 0.0,
            revision: 0,
            updated_at: now,
        }
    }

    /// 总容量上限（升）= 累计桶数 × 单桶容量
    pub fn max_capacity_liters(&self) -> f64 {
        self.total_barrels as f64 * BARREL_CAPACITY_LITERS
    }
}

// ==========================================
// UsageEvent - 耗液记账事件
// ==========================================
// 只增不改; 每订单至多一条（order_id 唯一约束）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub event_id: String,                // 事件 ID（UUID）
    pub order_id: String,                // 关联订单号（唯一）
    pub area_m2: f64,                    // 加工面积（平米）
    pub liters_consumed: f64,            // 消耗液量（升）
    pub cost_incurred: f64,              // 产生成本
    pub created_at: DateTime<Utc>,       // 记账时间
}

// ==========================================
// LedgerSettingsPatch - 台账参数部分更新
// ==========================================
// 缺省字段保持原值; 非法值整体拒绝,台账不变
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerSettingsPatch {
    pub cost_per_barrel: Option<f64>,
    pub recycling_cost_per_barrel: Option<f64>,
    pub cost_per_square_meter: Option<f64>,
    pub liters_per_square_meter: Option<f64>,
    pub recycling_rate: Option<f64>,
}

// ==========================================
// MonthlyAggregate - 月度汇总（派生,不落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub orders_processed: i64,           // 本月记账订单数（按 order_id 去重）
    pub total_area_m2: f64,              // 本月累计加工面积
    pub total_liters_used: f64,          // 本月累计耗液
    pub total_cost: f64,                 // 本月累计成本
}

impl MonthlyAggregate {
    /// 空汇总（无记账历史）
    pub fn empty() -> Self {
        Self {
            orders_processed: 0,
            total_area_m2: 0.0,
            total_liters_used: 0.0,
            total_cost: 0.0,
        }
    }
}
