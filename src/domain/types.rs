// ==========================================
// 柔印制版生产管理系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 状态随工序完成单调推进; ON_HOLD/CANCELLED 为人工终止态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Submitted,        // 已提交
    Designing,        // 设计中
    DesignDone,       // 设计完成
    InPrepress,       // 制版中
    ReadyForDelivery, // 待发货
    Delivered,        // 已发货
    Completed,        // 已完结
    OnHold,           // 挂起
    Cancelled,        // 已取消
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrderStatus {
    /// 从数据库字符串解析订单状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUBMITTED" => Some(OrderStatus::Submitted),
            "DESIGNING" => Some(OrderStatus::Designing),
            "DESIGN_DONE" => Some(OrderStatus::DesignDone),
            "IN_PREPRESS" => Some(OrderStatus::InPrepress),
            "READY_FOR_DELIVERY" => Some(OrderStatus::ReadyForDelivery),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "COMPLETED" => Some(OrderStatus::Completed),
            "ON_HOLD" => Some(OrderStatus::OnHold),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::Designing => "DESIGNING",
            OrderStatus::DesignDone => "DESIGN_DONE",
            OrderStatus::InPrepress => "IN_PREPRESS",
            OrderStatus::ReadyForDelivery => "READY_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::OnHold => "ON_HOLD",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否为终止态（不再接受任何状态转换）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::OnHold | OrderStatus::Cancelled
        )
    }
}

// ==========================================
// 生产阶段 (Stage Kind)
// ==========================================
// 固定四阶段: 设计 → 制版 → 生产 → 发货
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageKind {
    Design,     // 设计
    Prepress,   // 制版
    Production, // 生产
    Delivery,   // 发货
}

impl StageKind {
    /// 按生产顺序返回全部阶段
    pub fn all() -> [StageKind; 4] {
        [
            StageKind::Design,
            StageKind::Prepress,
            StageKind::Production,
            StageKind::Delivery,
        ]
    }

    /// 从数据库字符串解析阶段
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DESIGN" => Some(StageKind::Design),
            "PREPRESS" => Some(StageKind::Prepress),
            "PRODUCTION" => Some(StageKind::Production),
            "DELIVERY" => Some(StageKind::Delivery),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StageKind::Design => "DESIGN",
            StageKind::Prepress => "PREPRESS",
            StageKind::Production => "PRODUCTION",
            StageKind::Delivery => "DELIVERY",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 阶段状态 (Stage Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,    // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
}

impl StageStatus {
    /// 从数据库字符串解析阶段状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(StageStatus::Pending),
            "IN_PROGRESS" => Some(StageStatus::InProgress),
            "COMPLETED" => Some(StageStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "PENDING",
            StageStatus::InProgress => "IN_PROGRESS",
            StageStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 子工序状态 (Sub-process Status)
// ==========================================
// 子工序只有两态: 完成 / 未完成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubProcessStatus {
    Pending,   // 未完成
    Completed, // 已完成
}

impl SubProcessStatus {
    /// 从数据库字符串解析子工序状态
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(SubProcessStatus::Pending),
            "COMPLETED" => Some(SubProcessStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SubProcessStatus::Pending => "PENDING",
            SubProcessStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for SubProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for status in [
            OrderStatus::Submitted,
            OrderStatus::Designing,
            OrderStatus::DesignDone,
            OrderStatus::InPrepress,
            OrderStatus::ReadyForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::OnHold,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.to_db_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("NOT_A_STATUS"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::OnHold.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
    }
}
