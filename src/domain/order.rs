// ==========================================
// 柔印制版生产管理系统 - 订单领域模型
// ==========================================
// 对齐: production_order / order_stage / order_sub_process 表
// 红线: 订单只经由 WorkflowApi 变更,不直接写库
// ==========================================

use crate::domain::types::{OrderStatus, StageKind, StageStatus, SubProcessStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// PlateDimensions - 版材尺寸规格
// ==========================================
// 单位: 厘米; 拼版数 (repeat) 缺省或 <=0 时按 1 计
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateDimensions {
    pub width_cm: f64,            // 单模宽度（cm）
    pub height_cm: f64,           // 单模高度（cm）
    pub width_repeat: Option<i32>,  // 横向拼版数
    pub height_repeat: Option<i32>, // 纵向拼版数
}

impl PlateDimensions {
    /// 有效横向拼版数（缺省或非正值按 1 计）
    pub fn effective_width_repeat(&self) -> i32 {
        match self.width_repeat {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }

    /// 有效纵向拼版数（缺省或非正值按 1 计）
    pub fn effective_height_repeat(&self) -> i32 {
        match self.height_repeat {
            Some(n) if n > 0 => n,
            _ => 1,
        }
    }
}

// ==========================================
// StageState - 阶段状态
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub stage: StageKind,                      // 阶段
    pub status: StageStatus,                   // 阶段状态
    pub completed_at: Option<DateTime<Utc>>,   // 完成时间
}

impl StageState {
    /// 创建初始（未开始）阶段状态
    pub fn pending(stage: StageKind) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
            completed_at: None,
        }
    }
}

// ==========================================
// SubProcessState - 制版子工序状态
// ==========================================
// 子工序集合在订单登记时由工艺模板实例化,此后不变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubProcessState {
    pub code: String,                          // 子工序代码（如 WASHOUT）
    pub seq_no: i32,                           // 模板内顺序号
    pub status: SubProcessStatus,              // 子工序状态
    pub completed_at: Option<DateTime<Utc>>,   // 完成时间
}

// ==========================================
// ProductionOrder - 生产订单
// ==========================================
// 唯一事实层: 状态与工序进度以此为准
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    // ===== 主键与基础信息 =====
    pub order_id: String,                      // 订单号
    pub client_name: Option<String>,           // 客户名称（展示用影子字段）
    pub product_name: Option<String>,          // 产品名称（展示用影子字段）

    // ===== 工艺模板 =====
    pub template_id: String,                   // 工艺模板 ID（产品线）

    // ===== 状态 =====
    pub status: OrderStatus,                   // 订单状态
    pub stages: Vec<StageState>,               // 阶段状态（固定四阶段,顺序同 StageKind::all）
    pub sub_processes: Vec<SubProcessState>,   // 制版子工序状态（模板顺序）

    // ===== 规格 =====
    pub dimensions: Option<PlateDimensions>,   // 版材尺寸（缺失时不触发耗液记账）

    // ===== 耗液记账防重 =====
    pub usage_recorded: bool,                  // 已记账标记（整单只记一次）

    // ===== 并发控制 =====
    pub revision: i32,                         // 乐观锁修订号

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,             // 记录创建时间
    pub updated_at: DateTime<Utc>,             // 记录更新时间
}

impl ProductionOrder {
    /// 按工艺模板创建新订单（状态 SUBMITTED,全部工序未开始）
    pub fn new(
        order_id: String,
        template_id: String,
        sub_process_codes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let stages = StageKind::all().iter().map(|s| StageState::pending(*s)).collect();
        let sub_processes = sub_process_codes
            .iter()
            .enumerate()
            .map(|(i, code)| SubProcessState {
                code: code.clone(),
                seq_no: i as i32 + 1,
                status: SubProcessStatus::Pending,
                completed_at: None,
            })
            .collect();

        Self {
            order_id,
            client_name: None,
            product_name: None,
            template_id,
            status: OrderStatus::Submitted,
            stages,
            sub_processes,
            dimensions: None,
            usage_recorded: false,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 查找阶段状态
    pub fn stage(&self, kind: StageKind) -> Option<&StageState> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// 查找阶段状态（可变）
    pub fn stage_mut(&mut self, kind: StageKind) -> Option<&mut StageState> {
        self.stages.iter_mut().find(|s| s.stage == kind)
    }

    /// 查找子工序状态
    pub fn sub_process(&self, code: &str) -> Option<&SubProcessState> {
        self.sub_processes.iter().find(|p| p.code == code)
    }

    /// 查找子工序状态（可变）
    pub fn sub_process_mut(&mut self, code: &str) -> Option<&mut SubProcessState> {
        self.sub_processes.iter_mut().find(|p| p.code == code)
    }
}

// ==========================================
// Trait: PrepressProgress
// ==========================================
// 用途: 制版进度判定接口（状态机/看板共用）
pub trait PrepressProgress {
    /// 是否全部子工序已完成
    fn all_sub_processes_completed(&self) -> bool;

    /// 已完成子工序数 / 总数
    fn sub_process_progress(&self) -> (usize, usize);
}

impl PrepressProgress for ProductionOrder {
    fn all_sub_processes_completed(&self) -> bool {
        !self.sub_processes.is_empty()
            && self
                .sub_processes
                .iter()
                .all(|p| p.status == SubProcessStatus::Completed)
    }

    fn sub_process_progress(&self) -> (usize, usize) {
        let done = self
            .sub_processes
            .iter()
            .filter(|p| p.status == SubProcessStatus::Completed)
            .count();
        (done, self.sub_processes.len())
    }
}

// ==========================================
// OrderDraft - 订单登记入参
// ==========================================
// 用途: 外部订单提交方（接单系统）登记订单时的入参
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_id: String,                    // 订单号（调用方生成）
    pub template_id: Option<String>,         // 工艺模板 ID（缺省用默认模板）
    pub client_name: Option<String>,         // 客户名称
    pub product_name: Option<String>,        // 产品名称
    pub dimensions: Option<PlateDimensions>, // 版材尺寸
}
