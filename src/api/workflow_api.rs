// ==========================================
// 柔印制版生产管理系统 - 工作流门面 API
// ==========================================
// 职责: 订单工艺流程变更的唯一入口
// 规则: 工序推进为权威事实; 台账记账失败只降级为告警,不回滚工序
// ==========================================

use std::sync::Arc;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::WorkflowConfigReader;
use crate::domain::ledger::UsageEvent;
use crate::domain::order::{OrderDraft, PrepressProgress, ProductionOrder};
use crate::domain::types::{OrderStatus, SubProcessStatus};
use crate::engine::consumption::ConsumptionEngine;
use crate::engine::geometry::GeometryCalculator;
use crate::engine::state_machine::WorkflowStateMachine;
use crate::repository::error::RepositoryError;
use crate::repository::ledger_repo::{ResourceLedgerRepository, UsageEventRepository};
use crate::repository::order_repo::OrderRepository;

// ==========================================
// OrderSummary - 订单列表视图
// ==========================================
/// 用于前端列表展示的订单概要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub client_name: Option<String>,
    pub product_name: Option<String>,
    pub template_id: String,
    pub status: String,
    pub sub_processes_done: usize,
    pub sub_processes_total: usize,
    pub usage_recorded: bool,
    pub updated_at: chrono::DateTime<Utc>,
}

// ==========================================
// SubProcessUpdateOutcome - 子工序变更结果
// ==========================================
/// 子工序变更的完整回执: 工序为权威结果,记账/告警为附加信息
#[derive(Debug, Clone)]
pub struct SubProcessUpdateOutcome {
    pub order: ProductionOrder,
    pub usage_event: Option<UsageEvent>,
    pub warning: Option<String>,
    pub reasons: Vec<String>,
}

// ==========================================
// WorkflowApi - 工作流门面
// ==========================================

/// 工作流门面API
///
/// 职责：
/// 1. 订单登记（按工艺模板实例化子工序集合）
/// 2. 状态/阶段/子工序变更（委托状态机,带乐观锁持久化）
/// 3. 洗版液耗液记账触发（洗版工序完成时,整单只记一次）
pub struct WorkflowApi<C>
where
    C: WorkflowConfigReader,
{
    order_repo: Arc<OrderRepository>,
    ledger_repo: Arc<ResourceLedgerRepository>,
    usage_repo: Arc<UsageEventRepository>,
    config: Arc<C>,
}

impl<C> WorkflowApi<C>
where
    C: WorkflowConfigReader,
{
    /// 创建新的WorkflowApi实例
    pub fn new(
        order_repo: Arc<OrderRepository>,
        ledger_repo: Arc<ResourceLedgerRepository>,
        usage_repo: Arc<UsageEventRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            order_repo,
            ledger_repo,
            usage_repo,
            config,
        }
    }

    // ==========================================
    // 订单登记与查询
    // ==========================================

    /// 登记新订单（外部接单系统调用,鉴权由外部负责）
    ///
    /// # 规则
    /// - 工艺模板缺省用配置的默认模板
    /// - 子工序集合在此刻实例化,此后不变
    #[instrument(skip(self, draft), fields(order_id = %draft.order_id))]
    pub async fn register_order(&self, draft: OrderDraft) -> ApiResult<ProductionOrder> {
        let order_id = draft.order_id.trim().to_string();
        if order_id.is_empty() {
            return Err(ApiError::InvalidInput("订单号不能为空".to_string()));
        }

        let template_id = match draft.template_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => self
                .config
                .get_default_template_id()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?,
        };

        let codes = self
            .config
            .get_workflow_template(&template_id)
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?
            .ok_or_else(|| ApiError::InvalidInput(format!("未知工艺模板: {}", template_id)))?;
        if codes.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "工艺模板 {} 未配置任何子工序",
                template_id
            )));
        }

        let mut order = ProductionOrder::new(order_id, template_id, &codes, Utc::now());
        order.client_name = draft.client_name;
        order.product_name = draft.product_name;
        order.dimensions = draft.dimensions;

        match self.order_repo.insert(&order) {
            Ok(()) => {}
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ApiError::InvalidInput(format!(
                    "订单 {} 已登记",
                    order.order_id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            order_id = %order.order_id,
            template_id = %order.template_id,
            "订单登记完成"
        );
        Ok(order)
    }

    /// 按订单号查询完整订单
    pub fn get_order(&self, order_id: &str) -> ApiResult<ProductionOrder> {
        self.order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("订单 {} 不存在", order_id)))
    }

    /// 查询订单概要列表（可按状态过滤）
    pub fn list_orders(&self, status: Option<OrderStatus>) -> ApiResult<Vec<OrderSummary>> {
        let ids = self.order_repo.list_ids(status)?;

        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.order_repo.find_by_id(&id)? {
                let (done, total) = order.sub_process_progress();
                result.push(OrderSummary {
                    order_id: order.order_id.clone(),
                    client_name: order.client_name.clone(),
                    product_name: order.product_name.clone(),
                    template_id: order.template_id.clone(),
                    status: order.status.to_string(),
                    sub_processes_done: done,
                    sub_processes_total: total,
                    usage_recorded: order.usage_recorded,
                    updated_at: order.updated_at,
                });
            }
        }

        Ok(result)
    }

    // ==========================================
    // 工艺流程变更
    // ==========================================

    /// 更新子工序状态（耗液记账的唯一自动触发点）
    ///
    /// # 规则
    /// - 工序变更由状态机校验,失败同步拒绝
    /// - 触发工序（默认 WASHOUT）完成 且 订单有尺寸 且 未记账 → 记账一次
    /// - 记账侧任何失败只降级为 warning,工序推进照常持久化
    #[instrument(skip(self, order_id, code), fields(order_id = %order_id, code = %code))]
    pub async fn apply_sub_process_update(
        &self,
        order_id: &str,
        code: &str,
        new_status: SubProcessStatus,
    ) -> ApiResult<SubProcessUpdateOutcome> {
        let order = self.get_order(order_id)?;
        let now = Utc::now();

        let (mut updated, mut reasons) =
            WorkflowStateMachine::update_sub_process(&order, code, new_status, now)?;

        let mut usage_event = None;
        let mut warning = None;

        if new_status == SubProcessStatus::Completed && !updated.usage_recorded {
            let trigger_code = self
                .config
                .get_trigger_process_code()
                .await
                .map_err(|e| ApiError::ConfigError(e.to_string()))?;

            if code == trigger_code {
                match updated.dimensions {
                    Some(dims) => {
                        let (event, warn_msg) = self.record_usage_for_order(&updated, &dims, &mut reasons);
                        if event.is_some() {
                            updated.usage_recorded = true;
                        }
                        usage_event = event;
                        warning = warn_msg;
                    }
                    None => {
                        reasons.push("订单未申报尺寸,跳过耗液记账".to_string());
                    }
                }
            }
        }

        let persisted = self.order_repo.update_with_revision(&updated)?;

        if let Some(w) = &warning {
            warn!(order_id = %order_id, warning = %w, "子工序更新完成,记账侧存在告警");
        }
        info!(order_id = %order_id, code = %code, status = %new_status, "子工序更新完成");

        Ok(SubProcessUpdateOutcome {
            order: persisted,
            usage_event,
            warning,
            reasons,
        })
    }

    /// 制版完成复核（全部子工序完成后调用）
    pub fn mark_prepress_complete(&self, order_id: &str) -> ApiResult<ProductionOrder> {
        let order = self.get_order(order_id)?;
        let (updated, reasons) = WorkflowStateMachine::mark_prepress_complete(&order, Utc::now())?;
        let persisted = self.order_repo.update_with_revision(&updated)?;

        info!(order_id = %order_id, reasons = ?reasons, "制版完成复核通过");
        Ok(persisted)
    }

    /// 设置订单状态（管理员动作,合法性由状态机校验）
    pub fn set_status(&self, order_id: &str, target: OrderStatus) -> ApiResult<ProductionOrder> {
        let order = self.get_order(order_id)?;
        let (updated, reasons) = WorkflowStateMachine::set_status(&order, target, Utc::now())?;
        let persisted = self.order_repo.update_with_revision(&updated)?;

        info!(order_id = %order_id, target = %target, reasons = ?reasons, "订单状态更新完成");
        Ok(persisted)
    }

    // ==========================================
    // 内部: 耗液记账（自动触发路径）
    // ==========================================

    /// 为订单执行一次耗液记账,返回 (事件, 告警)
    ///
    /// 幂等: 已存在记账事件时直接返回既有事件,不再扣减
    fn record_usage_for_order(
        &self,
        order: &ProductionOrder,
        dims: &crate::domain::order::PlateDimensions,
        reasons: &mut Vec<String>,
    ) -> (Option<UsageEvent>, Option<String>) {
        let area = match GeometryCalculator::compute_area(dims) {
            Ok(a) => a,
            Err(e) => {
                return (None, Some(format!("耗液记账未执行: {}", e)));
            }
        };

        // 防重前置检查（order_id 唯一约束兜底）
        match self.usage_repo.find_by_order(&order.order_id) {
            Ok(Some(existing)) => {
                reasons.push("记账事件已存在,幂等返回既有事件".to_string());
                return (Some(existing), None);
            }
            Ok(None) => {}
            Err(e) => {
                return (None, Some(format!("耗液记账未执行: {}", e)));
            }
        }

        let ledger = match self.ledger_repo.load() {
            Ok(l) => l,
            Err(e) => {
                return (None, Some(format!("耗液记账未执行: {}", e)));
            }
        };

        let plan = match ConsumptionEngine::plan_usage(&ledger, &order.order_id, area, Utc::now()) {
            Ok(p) => p,
            Err(e) => {
                return (None, Some(format!("耗液记账未执行: {}", e)));
            }
        };

        if let Err(e) = self.ledger_repo.update_with_revision(&plan.ledger) {
            return (None, Some(format!("耗液记账未执行: {}", e)));
        }

        if let Err(e) = self.usage_repo.insert(&plan.event) {
            // 并发兜底: 唯一约束命中说明他人已记账,幂等返回
            if let RepositoryError::UniqueConstraintViolation(_) = e {
                if let Ok(Some(existing)) = self.usage_repo.find_by_order(&order.order_id) {
                    reasons.push("记账事件已由并发操作写入,幂等返回".to_string());
                    return (Some(existing), None);
                }
            }
            return (None, Some(format!("记账事件写入失败: {}", e)));
        }

        reasons.push(format!(
            "耗液记账完成: area={:.3}m², liters={:.1}L, cost={:.2}",
            plan.event.area_m2, plan.event.liters_consumed, plan.event.cost_incurred
        ));

        let warning = plan.shortage.map(|s| s.to_string());
        (Some(plan.event), warning)
    }
}
