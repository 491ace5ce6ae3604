// ==========================================
// 柔印制版生产管理系统 - 耗液记账引擎
// ==========================================
// 职责: 补液、耗液记账、参数变更的台账推演
// 红线: 不直接写库,只计算和返回更新后的台账
// 红线: 余量不足不阻断记账,转负并上报 InsufficientInventory
// ==========================================

use crate::domain::ledger::{
    LedgerSettingsPatch, ResourceLedger, UsageEvent, BARREL_CAPACITY_LITERS,
};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::geometry::GeometryCalculator;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ==========================================
// UsagePlan - 记账推演结果
// ==========================================
// 用途: API 层据此持久化台账与事件,shortage 转为非阻断告警
#[derive(Debug, Clone)]
pub struct UsagePlan {
    pub ledger: ResourceLedger,          // 扣减后的台账
    pub event: UsageEvent,               // 待追加的记账事件
    pub shortage: Option<WorkflowError>, // 余量不足告警（软性）
}

// ==========================================
// ConsumptionEngine - 台账推演引擎
// ==========================================
pub struct ConsumptionEngine;

impl ConsumptionEngine {
    /// 补液入库
    ///
    /// # 规则
    /// - barrel_count 必须为正整数,否则 InvalidQuantity
    /// - total_barrels += barrel_count; current_liters += barrel_count × 200
    pub fn apply_refill(
        ledger: &ResourceLedger,
        barrel_count: i64,
        now: DateTime<Utc>,
    ) -> WorkflowResult<ResourceLedger> {
        if barrel_count <= 0 {
            return Err(WorkflowError::InvalidQuantity(barrel_count));
        }

        let mut updated = ledger.clone();
        updated.total_barrels += barrel_count;
        updated.current_liters += barrel_count as f64 * BARREL_CAPACITY_LITERS;
        updated.updated_at = now;

        Ok(updated)
    }

    /// 耗液记账推演
    ///
    /// # 规则
    /// - 液量/成本按当前台账参数由加工面积推导
    /// - 扣减可使余量为负: 记账照常落账,shortage 携带告警
    /// - order_id 防重由仓储层唯一约束 + API 层前置检查保证
    ///
    /// # 返回
    /// - Ok(UsagePlan): 扣减后台账 + 记账事件 + 可选余量告警
    /// - Err(InvalidGeometry): 面积非正或非有限数
    pub fn plan_usage(
        ledger: &ResourceLedger,
        order_id: &str,
        area_m2: f64,
        now: DateTime<Utc>,
    ) -> WorkflowResult<UsagePlan> {
        if !area_m2.is_finite() || area_m2 <= 0.0 {
            return Err(WorkflowError::InvalidGeometry(format!(
                "area_m2={} 必须为正数",
                area_m2
            )));
        }

        let liters = GeometryCalculator::compute_liters_needed(area_m2, ledger.liters_per_square_meter);
        let cost = GeometryCalculator::compute_cost(area_m2, ledger.cost_per_square_meter);

        let shortage = if liters > ledger.current_liters {
            Some(WorkflowError::InsufficientInventory {
                current_liters: ledger.current_liters,
                required_liters: liters,
            })
        } else {
            None
        };

        let mut updated = ledger.clone();
        updated.current_liters -= liters;
        updated.updated_at = now;

        let event = UsageEvent {
            event_id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            area_m2,
            liters_consumed: liters,
            cost_incurred: cost,
            created_at: now,
        };

        Ok(UsagePlan {
            ledger: updated,
            event,
            shortage,
        })
    }

    /// 合并台账参数部分更新
    ///
    /// # 规则
    /// - 仅更新给出的字段,缺省字段保持原值
    /// - recycling_rate 必须在 [0,1]; 其余参数必须为非负有限数
    /// - 任一字段非法则整体拒绝,台账不变
    pub fn apply_settings(
        ledger: &ResourceLedger,
        patch: &LedgerSettingsPatch,
        now: DateTime<Utc>,
    ) -> WorkflowResult<ResourceLedger> {
        let check_nonnegative = |field: &str, value: f64| -> WorkflowResult<f64> {
            if !value.is_finite() || value < 0.0 {
                return Err(WorkflowError::InvalidSetting {
                    field: field.to_string(),
                    message: format!("{} 必须为非负有限数", value),
                });
            }
            Ok(value)
        };

        let mut updated = ledger.clone();

        if let Some(v) = patch.cost_per_barrel {
            updated.cost_per_barrel = check_nonnegative("cost_per_barrel", v)?;
        }
        if let Some(v) = patch.recycling_cost_per_barrel {
            updated.recycling_cost_per_barrel = check_nonnegative("recycling_cost_per_barrel", v)?;
        }
        if let Some(v) = patch.cost_per_square_meter {
            updated.cost_per_square_meter = check_nonnegative("cost_per_square_meter", v)?;
        }
        if let Some(v) = patch.liters_per_square_meter {
            updated.liters_per_square_meter = check_nonnegative("liters_per_square_meter", v)?;
        }
        if let Some(v) = patch.recycling_rate {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(WorkflowError::InvalidSetting {
                    field: "recycling_rate".to_string(),
                    message: format!("{} 超出 [0,1] 区间", v),
                });
            }
            updated.recycling_rate = v;
        }

        updated.updated_at = now;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ledger() -> ResourceLedger {
        let mut ledger = ResourceLedger::bootstrap(Utc::now());
        ledger.liters_per_square_meter = 10.0;
        ledger.cost_per_square_meter = 424.44;
        ledger
    }

    #[test]
    fn test_refill_accumulates() {
        let ledger = test_ledger();
        let now = Utc::now();

        let ledger = ConsumptionEngine::apply_refill(&ledger, 3, now).unwrap();
        assert_eq!(ledger.total_barrels, 3);
        assert!((ledger.current_liters - 600.0).abs() < 1e-9);

        let ledger = ConsumptionEngine::apply_refill(&ledger, 2, now).unwrap();
        assert_eq!(ledger.total_barrels, 5);
        assert!((ledger.current_liters - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_refill_rejects_nonpositive() {
        let ledger = test_ledger();
        assert!(matches!(
            ConsumptionEngine::apply_refill(&ledger, 0, Utc::now()),
            Err(WorkflowError::InvalidQuantity(0))
        ));
        assert!(matches!(
            ConsumptionEngine::apply_refill(&ledger, -5, Utc::now()),
            Err(WorkflowError::InvalidQuantity(-5))
        ));
    }

    #[test]
    fn test_plan_usage_deducts_and_costs() {
        let now = Utc::now();
        let ledger = ConsumptionEngine::apply_refill(&test_ledger(), 1, now).unwrap();

        let plan = ConsumptionEngine::plan_usage(&ledger, "PO-1001", 0.7, now).unwrap();
        assert!((plan.event.liters_consumed - 7.0).abs() < 1e-9);
        assert!((plan.event.cost_incurred - 297.108).abs() < 0.01);
        assert!((plan.ledger.current_liters - 193.0).abs() < 1e-9);
        assert!(plan.shortage.is_none());
        assert_eq!(plan.event.order_id, "PO-1001");
    }

    #[test]
    fn test_plan_usage_shortage_goes_negative_with_flag() {
        let ledger = test_ledger(); // 零库存
        let plan = ConsumptionEngine::plan_usage(&ledger, "PO-1002", 2.0, Utc::now()).unwrap();

        assert!((plan.ledger.current_liters - (-20.0)).abs() < 1e-9);
        assert!(matches!(
            plan.shortage,
            Some(WorkflowError::InsufficientInventory { .. })
        ));
    }

    #[test]
    fn test_plan_usage_rejects_bad_area() {
        let ledger = test_ledger();
        assert!(matches!(
            ConsumptionEngine::plan_usage(&ledger, "PO-1003", 0.0, Utc::now()),
            Err(WorkflowError::InvalidGeometry(_))
        ));
        assert!(matches!(
            ConsumptionEngine::plan_usage(&ledger, "PO-1003", f64::INFINITY, Utc::now()),
            Err(WorkflowError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_apply_settings_partial_merge() {
        let ledger = test_ledger();
        let patch = LedgerSettingsPatch {
            cost_per_barrel: Some(1800.0),
            recycling_rate: Some(0.85),
            ..Default::default()
        };

        let updated = ConsumptionEngine::apply_settings(&ledger, &patch, Utc::now()).unwrap();
        assert!((updated.cost_per_barrel - 1800.0).abs() < 1e-9);
        assert!((updated.recycling_rate - 0.85).abs() < 1e-9);
        // 缺省字段保持原值
        assert!((updated.liters_per_square_meter - 10.0).abs() < 1e-9);
        assert!((updated.cost_per_square_meter - 424.44).abs() < 1e-9);
    }

    #[test]
    fn test_apply_settings_rejects_out_of_range() {
        let ledger = test_ledger();

        let patch = LedgerSettingsPatch {
            recycling_rate: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            ConsumptionEngine::apply_settings(&ledger, &patch, Utc::now()),
            Err(WorkflowError::InvalidSetting { .. })
        ));

        let patch = LedgerSettingsPatch {
            cost_per_square_meter: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            ConsumptionEngine::apply_settings(&ledger, &patch, Utc::now()),
            Err(WorkflowError::InvalidSetting { .. })
        ));
    }
}
