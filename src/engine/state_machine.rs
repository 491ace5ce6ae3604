// ==========================================
// 柔印制版生产管理系统 - 工艺流程状态机
// ==========================================
// 职责: 订单状态/阶段/子工序的合法转换判定与推进
// 红线: 不直接写库,只计算和返回更新后的订单
// 红线: 所有判定必须输出 reason（可解释性）
// ==========================================
// 状态链: SUBMITTED → DESIGNING → DESIGN_DONE → IN_PREPRESS
//         → READY_FOR_DELIVERY → DELIVERED / COMPLETED
// 任意非终止态可转 ON_HOLD / CANCELLED（人工终止,不可自动恢复）
// ==========================================

use crate::domain::order::{PrepressProgress, ProductionOrder};
use crate::domain::types::{OrderStatus, StageKind, StageStatus, SubProcessStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};

// ==========================================
// WorkflowStateMachine - 纯函数状态机
// ==========================================
pub struct WorkflowStateMachine;

impl WorkflowStateMachine {
    /// 判定状态转换是否合法
    ///
    /// # 规则
    /// - 主链只允许逐级前进（见模块头注释）
    /// - READY_FOR_DELIVERY 可直接转 COMPLETED（免发货单据的自提订单）
    /// - 任意非终止态可转 ON_HOLD / CANCELLED
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;

        if from.is_terminal() {
            return false;
        }
        if matches!(to, OnHold | Cancelled) {
            return true;
        }

        matches!(
            (from, to),
            (Submitted, Designing)
                | (Designing, DesignDone)
                | (DesignDone, InPrepress)
                | (InPrepress, ReadyForDelivery)
                | (ReadyForDelivery, Delivered)
                | (ReadyForDelivery, Completed)
                | (Delivered, Completed)
        )
    }

    /// 更新单个子工序状态
    ///
    /// # 规则
    /// - 子工序必须在订单的模板工序集合内,否则 UnknownSubProcess
    /// - 转 COMPLETED 时写入 completed_at,转回 PENDING 时清除
    /// - 全部子工序完成 → 制版阶段置 COMPLETED（订单状态不变,待管理员复核）
    /// - 任一子工序回退 → 制版阶段回退为 IN_PROGRESS
    /// - 终止态订单拒绝任何工序变更
    ///
    /// # 返回
    /// - (ProductionOrder, Vec<String>): 更新后的订单和决策原因
    pub fn update_sub_process(
        order: &ProductionOrder,
        code: &str,
        new_status: SubProcessStatus,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(ProductionOrder, Vec<String>)> {
        if order.status.is_terminal() {
            return Err(WorkflowError::IllegalTransition {
                from: order.status.to_db_str().to_string(),
                to: format!("sub_process:{}={}", code, new_status),
            });
        }

        let mut updated = order.clone();
        let mut reasons = Vec::new();

        {
            let template_id = updated.template_id.clone();
            let proc = updated.sub_process_mut(code).ok_or_else(|| {
                WorkflowError::UnknownSubProcess {
                    code: code.to_string(),
                    template_id,
                }
            })?;

            if proc.status == new_status {
                reasons.push(format!("子工序 {} 已处于 {},无变化", code, new_status));
            } else {
                proc.status = new_status;
                proc.completed_at = match new_status {
                    SubProcessStatus::Completed => Some(now),
                    SubProcessStatus::Pending => None,
                };
                reasons.push(format!("子工序 {} → {}", code, new_status));
            }
        }

        Self::sync_prepress_stage(&mut updated, now, &mut reasons);
        updated.updated_at = now;

        Ok((updated, reasons))
    }

    /// 制版完成复核
    ///
    /// # 规则
    /// - 要求全部子工序已完成,否则 PrepressIncomplete
    /// - 订单状态保持 IN_PREPRESS（转 READY_FOR_DELIVERY 是独立的管理员动作）
    pub fn mark_prepress_complete(
        order: &ProductionOrder,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(ProductionOrder, Vec<String>)> {
        if !order.all_sub_processes_completed() {
            let (done, total) = order.sub_process_progress();
            return Err(WorkflowError::PrepressIncomplete(format!(
                "order_id={}, 完成进度 {}/{}",
                order.order_id, done, total
            )));
        }

        let mut updated = order.clone();
        let mut reasons = vec![format!("订单 {} 制版工序全部完成", order.order_id)];
        Self::sync_prepress_stage(&mut updated, now, &mut reasons);
        updated.updated_at = now;

        Ok((updated, reasons))
    }

    /// 设置订单状态（带合法性校验与阶段投影）
    ///
    /// # 返回
    /// - (ProductionOrder, Vec<String>): 更新后的订单和决策原因
    /// - Err(IllegalTransition): 目标状态不可达
    /// - Err(PrepressIncomplete): 转 READY_FOR_DELIVERY 但制版未完成
    pub fn set_status(
        order: &ProductionOrder,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> WorkflowResult<(ProductionOrder, Vec<String>)> {
        if !Self::can_transition(order.status, target) {
            return Err(WorkflowError::IllegalTransition {
                from: order.status.to_db_str().to_string(),
                to: target.to_db_str().to_string(),
            });
        }

        if target == OrderStatus::ReadyForDelivery {
            let prepress_done = order
                .stage(StageKind::Prepress)
                .map(|s| s.status == StageStatus::Completed)
                .unwrap_or(false);
            if !prepress_done {
                let (done, total) = order.sub_process_progress();
                return Err(WorkflowError::PrepressIncomplete(format!(
                    "order_id={}, 完成进度 {}/{}",
                    order.order_id, done, total
                )));
            }
        }

        let mut updated = order.clone();
        let mut reasons = vec![format!("状态 {} → {}", order.status, target)];

        updated.status = target;
        Self::project_stages(&mut updated, target, now, &mut reasons);
        updated.updated_at = now;

        Ok((updated, reasons))
    }

    // ==========================================
    // 内部: 阶段同步
    // ==========================================

    /// 按子工序完成度同步制版阶段状态
    fn sync_prepress_stage(
        order: &mut ProductionOrder,
        now: DateTime<Utc>,
        reasons: &mut Vec<String>,
    ) {
        let all_done = order.all_sub_processes_completed();
        if let Some(stage) = order.stage_mut(StageKind::Prepress) {
            match (all_done, stage.status) {
                (true, s) if s != StageStatus::Completed => {
                    stage.status = StageStatus::Completed;
                    stage.completed_at = Some(now);
                    reasons.push("制版阶段 → COMPLETED（全部子工序完成,待复核发货）".to_string());
                }
                (false, StageStatus::Completed) => {
                    stage.status = StageStatus::InProgress;
                    stage.completed_at = None;
                    reasons.push("制版阶段回退 → IN_PROGRESS（子工序被重置）".to_string());
                }
                (false, StageStatus::Pending) => {
                    // 有工序活动即视为制版开工
                    stage.status = StageStatus::InProgress;
                    reasons.push("制版阶段 → IN_PROGRESS".to_string());
                }
                _ => {}
            }
        }
    }

    /// 状态转换到阶段的投影规则
    fn project_stages(
        order: &mut ProductionOrder,
        target: OrderStatus,
        now: DateTime<Utc>,
        reasons: &mut Vec<String>,
    ) {
        let mut set_stage = |kind: StageKind, status: StageStatus| {
            if let Some(stage) = order.stage_mut(kind) {
                if stage.status != status {
                    stage.status = status;
                    stage.completed_at = match status {
                        StageStatus::Completed => Some(now),
                        _ => None,
                    };
                    reasons.push(format!("阶段 {} → {}", kind, status));
                }
            }
        };

        match target {
            OrderStatus::Designing => set_stage(StageKind::Design, StageStatus::InProgress),
            OrderStatus::DesignDone => set_stage(StageKind::Design, StageStatus::Completed),
            OrderStatus::InPrepress => set_stage(StageKind::Prepress, StageStatus::InProgress),
            OrderStatus::ReadyForDelivery => {
                set_stage(StageKind::Production, StageStatus::Completed);
                set_stage(StageKind::Delivery, StageStatus::InProgress);
            }
            OrderStatus::Delivered => set_stage(StageKind::Delivery, StageStatus::Completed),
            // COMPLETED / ON_HOLD / CANCELLED 不回写阶段,保留既有进度事实
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_order() -> ProductionOrder {
        let codes: Vec<String> = ["BACK_EXPOSURE", "LASER_IMAGING", "MAIN_EXPOSURE", "WASHOUT", "DRYING"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        ProductionOrder::new("PO-1001".to_string(), "standard".to_string(), &codes, Utc::now())
    }

    #[test]
    fn test_forward_chain() {
        let order = test_order();
        let now = Utc::now();

        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::Designing, now).unwrap();
        assert_eq!(order.status, OrderStatus::Designing);
        assert_eq!(
            order.stage(StageKind::Design).unwrap().status,
            StageStatus::InProgress
        );

        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::DesignDone, now).unwrap();
        assert_eq!(
            order.stage(StageKind::Design).unwrap().status,
            StageStatus::Completed
        );
        assert!(order.stage(StageKind::Design).unwrap().completed_at.is_some());

        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::InPrepress, now).unwrap();
        assert_eq!(
            order.stage(StageKind::Prepress).unwrap().status,
            StageStatus::InProgress
        );
    }

    #[test]
    fn test_skip_ahead_rejected() {
        let order = test_order();
        let result = WorkflowStateMachine::set_status(&order, OrderStatus::Completed, Utc::now());
        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_hold_and_cancel_from_any_nonterminal() {
        let order = test_order();
        let now = Utc::now();

        let (held, _) = WorkflowStateMachine::set_status(&order, OrderStatus::OnHold, now).unwrap();
        assert_eq!(held.status, OrderStatus::OnHold);

        // 终止态不再接受任何转换
        let result = WorkflowStateMachine::set_status(&held, OrderStatus::Designing, now);
        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
        let result = WorkflowStateMachine::set_status(&held, OrderStatus::Cancelled, now);
        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_update_sub_process_sets_and_clears_completed_at() {
        let order = test_order();
        let now = Utc::now();

        let (order, _) =
            WorkflowStateMachine::update_sub_process(&order, "WASHOUT", SubProcessStatus::Completed, now)
                .unwrap();
        let proc = order.sub_process("WASHOUT").unwrap();
        assert_eq!(proc.status, SubProcessStatus::Completed);
        assert_eq!(proc.completed_at, Some(now));

        let (order, _) =
            WorkflowStateMachine::update_sub_process(&order, "WASHOUT", SubProcessStatus::Pending, now)
                .unwrap();
        let proc = order.sub_process("WASHOUT").unwrap();
        assert_eq!(proc.status, SubProcessStatus::Pending);
        assert!(proc.completed_at.is_none());
    }

    #[test]
    fn test_unknown_sub_process() {
        let order = test_order();
        let result = WorkflowStateMachine::update_sub_process(
            &order,
            "ENGRAVING",
            SubProcessStatus::Completed,
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(WorkflowError::UnknownSubProcess { .. })
        ));
    }

    #[test]
    fn test_all_sub_processes_complete_marks_prepress_stage() {
        let mut order = test_order();
        let now = Utc::now();

        let codes: Vec<String> = order.sub_processes.iter().map(|p| p.code.clone()).collect();
        for code in &codes {
            let (next, _) =
                WorkflowStateMachine::update_sub_process(&order, code, SubProcessStatus::Completed, now)
                    .unwrap();
            order = next;
        }

        assert_eq!(
            order.stage(StageKind::Prepress).unwrap().status,
            StageStatus::Completed
        );
        // 订单状态不自动推进,由管理员复核后转 READY_FOR_DELIVERY
        assert_eq!(order.status, OrderStatus::Submitted);

        // 任一子工序回退 → 阶段回退
        let (order, _) =
            WorkflowStateMachine::update_sub_process(&order, "DRYING", SubProcessStatus::Pending, now)
                .unwrap();
        assert_eq!(
            order.stage(StageKind::Prepress).unwrap().status,
            StageStatus::InProgress
        );
    }

    #[test]
    fn test_mark_prepress_complete_requires_all_done() {
        let order = test_order();
        let result = WorkflowStateMachine::mark_prepress_complete(&order, Utc::now());
        assert!(matches!(result, Err(WorkflowError::PrepressIncomplete(_))));
    }

    #[test]
    fn test_ready_for_delivery_requires_prepress_completed() {
        let order = test_order();
        let now = Utc::now();
        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::Designing, now).unwrap();
        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::DesignDone, now).unwrap();
        let (order, _) = WorkflowStateMachine::set_status(&order, OrderStatus::InPrepress, now).unwrap();

        let result = WorkflowStateMachine::set_status(&order, OrderStatus::ReadyForDelivery, now);
        assert!(matches!(result, Err(WorkflowError::PrepressIncomplete(_))));
    }

    #[test]
    fn test_terminal_order_rejects_sub_process_update() {
        let order = test_order();
        let now = Utc::now();
        let (cancelled, _) =
            WorkflowStateMachine::set_status(&order, OrderStatus::Cancelled, now).unwrap();

        let result = WorkflowStateMachine::update_sub_process(
            &cancelled,
            "WASHOUT",
            SubProcessStatus::Completed,
            now,
        );
        assert!(matches!(
            result,
            Err(WorkflowError::IllegalTransition { .. })
        ));
    }
}
