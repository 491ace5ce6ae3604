// ==========================================
// 柔印制版生产管理系统 - 洗版液台账 API
// ==========================================
// 职责: 补液、参数管理、人工记账补录、状态快照
// 规则: 余量不足不阻断记账,转负并在日志中告警
// ==========================================

use std::sync::Arc;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::WorkflowConfigReader;
use crate::domain::ledger::{LedgerSettingsPatch, MonthlyAggregate, UsageEvent};
use crate::engine::consumption::ConsumptionEngine;
use crate::engine::error::WorkflowError;
use crate::engine::reporter::AggregationReporter;
use crate::repository::error::RepositoryError;
use crate::repository::ledger_repo::{ResourceLedgerRepository, UsageEventRepository};

// ==========================================
// ResourceStatusView - 台账状态视图
// ==========================================

/// 派生指标（展示口径）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetrics {
    pub fill_percentage: f64,                  // 液位百分比 [0,100]
    pub max_capacity_liters: f64,              // 容量上限（升）
    pub estimated_days_remaining: Option<f64>, // 余量可用天数（无历史时 None → 前端显示 N/A）
}

/// 台账完整状态（参数 + 派生指标 + 当月汇总）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatusView {
    pub current_liters: f64,
    pub total_barrels: i64,
    pub cost_per_barrel: f64,
    pub recycling_cost_per_barrel: f64,
    pub cost_per_square_meter: f64,
    pub liters_per_square_meter: f64,
    pub recycling_rate: f64,
    pub metrics: ResourceMetrics,
    pub monthly_stats: MonthlyAggregate,
}

// ==========================================
// ResourceApi - 台账 API
// ==========================================

/// 台账API
///
/// 职责：
/// 1. 补液入库（正整数桶,乐观锁串行化）
/// 2. 成本/消耗参数部分更新（非法值整体拒绝）
/// 3. 人工记账补录（严格防重,与自动触发共用唯一约束）
/// 4. 状态快照（液位、可用天数、当月汇总）
pub struct ResourceApi<C>
where
    C: WorkflowConfigReader,
{
    ledger_repo: Arc<ResourceLedgerRepository>,
    usage_repo: Arc<UsageEventRepository>,
    config: Arc<C>,
}

impl<C> ResourceApi<C>
where
    C: WorkflowConfigReader,
{
    /// 创建新的ResourceApi实例
    pub fn new(
        ledger_repo: Arc<ResourceLedgerRepository>,
        usage_repo: Arc<UsageEventRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            ledger_repo,
            usage_repo,
            config,
        }
    }

    /// 补液入库
    ///
    /// # 返回
    /// - Ok(ResourceStatusView): 更新后的台账状态
    /// - Err(Workflow(InvalidQuantity)): 桶数非正
    #[instrument(skip(self))]
    pub async fn refill(&self, barrel_count: i64) -> ApiResult<ResourceStatusView> {
        let ledger = self.ledger_repo.load()?;
        let updated = ConsumptionEngine::apply_refill(&ledger, barrel_count, Utc::now())?;
        let persisted = self.ledger_repo.update_with_revision(&updated)?;

        info!(
            barrel_count,
            total_barrels = persisted.total_barrels,
            current_liters = persisted.current_liters,
            "补液入库完成"
        );
        self.status().await
    }

    /// 更新台账参数（部分更新,非法值整体拒绝）
    #[instrument(skip(self, patch))]
    pub async fn update_settings(&self, patch: LedgerSettingsPatch) -> ApiResult<ResourceStatusView> {
        let ledger = self.ledger_repo.load()?;
        let updated = ConsumptionEngine::apply_settings(&ledger, &patch, Utc::now())?;
        let persisted = self.ledger_repo.update_with_revision(&updated)?;

        info!(revision = persisted.revision, "台账参数更新完成");
        self.status().await
    }

    /// 人工记账补录（授权人员手工修正路径）
    ///
    /// # 规则
    /// - 与自动触发不同: 已存在记账事件时直接拒绝（DuplicateUsage）
    /// - 余量不足仍然落账,记录 warn 日志
    #[instrument(skip(self, order_id), fields(order_id = %order_id))]
    pub async fn record_usage(&self, order_id: &str, area_m2: f64) -> ApiResult<UsageEvent> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ApiError::InvalidInput("订单号不能为空".to_string()));
        }

        if self.usage_repo.find_by_order(order_id)?.is_some() {
            return Err(WorkflowError::DuplicateUsage(order_id.to_string()).into());
        }

        let ledger = self.ledger_repo.load()?;
        let plan = ConsumptionEngine::plan_usage(&ledger, order_id, area_m2, Utc::now())?;

        self.ledger_repo.update_with_revision(&plan.ledger)?;

        match self.usage_repo.insert(&plan.event) {
            Ok(()) => {}
            // 并发兜底: 前置检查后他人已写入
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(WorkflowError::DuplicateUsage(order_id.to_string()).into());
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(shortage) = &plan.shortage {
            warn!(order_id = %order_id, "{}", shortage);
        }

        info!(
            order_id = %order_id,
            liters = plan.event.liters_consumed,
            cost = plan.event.cost_incurred,
            "人工记账补录完成"
        );
        Ok(plan.event)
    }

    /// 台账状态快照（只读,供前端轮询展示）
    pub async fn status(&self) -> ApiResult<ResourceStatusView> {
        let ledger = self.ledger_repo.load()?;
        let now = Utc::now();

        let window_days = self
            .config
            .get_consumption_window_days()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        // 单次取数同时覆盖统计窗口与当月（月长不超过 31 天）
        let cutoff = now - Duration::days(window_days.max(31));
        let events = self.usage_repo.list_since(cutoff)?;

        let monthly_stats = AggregationReporter::monthly_stats(&events, now);
        let metrics = ResourceMetrics {
            fill_percentage: AggregationReporter::fill_percentage(&ledger),
            max_capacity_liters: ledger.max_capacity_liters(),
            estimated_days_remaining: AggregationReporter::estimated_days_remaining(
                &ledger,
                &events,
                now,
                window_days,
            ),
        };

        Ok(ResourceStatusView {
            current_liters: ledger.current_liters,
            total_barrels: ledger.total_barrels,
            cost_per_barrel: ledger.cost_per_barrel,
            recycling_cost_per_barrel: ledger.recycling_cost_per_barrel,
            cost_per_square_meter: ledger.cost_per_square_meter,
            liters_per_square_meter: ledger.liters_per_square_meter,
            recycling_rate: ledger.recycling_rate,
            metrics,
            monthly_stats,
        })
    }
}
