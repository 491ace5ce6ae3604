// ==========================================
// 柔印制版生产管理系统 - 版材几何计算
// ==========================================
// 职责: 由订单申报尺寸推导加工面积、耗液量、成本
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::order::PlateDimensions;
use crate::engine::error::{WorkflowError, WorkflowResult};

// ==========================================
// GeometryCalculator - 纯函数工具类
// ==========================================
pub struct GeometryCalculator;

impl GeometryCalculator {
    /// 计算加工面积（平米）
    ///
    /// # 规则
    /// - area_m2 = (width_cm × width_repeat) × (height_cm × height_repeat) / 10000
    /// - 拼版数缺省或 <=0 时按 1 计
    ///
    /// # 参数
    /// - dims: 版材尺寸规格
    ///
    /// # 返回
    /// - Ok(f64): 加工面积（平米）
    /// - Err(InvalidGeometry): 宽或高 <=0 或非有限数
    pub fn compute_area(dims: &PlateDimensions) -> WorkflowResult<f64> {
        if !dims.width_cm.is_finite() || !dims.height_cm.is_finite() {
            return Err(WorkflowError::InvalidGeometry(format!(
                "width_cm={}, height_cm={} 非有限数",
                dims.width_cm, dims.height_cm
            )));
        }
        if dims.width_cm <= 0.0 || dims.height_cm <= 0.0 {
            return Err(WorkflowError::InvalidGeometry(format!(
                "width_cm={}, height_cm={} 必须为正数",
                dims.width_cm, dims.height_cm
            )));
        }

        let width_total_cm = dims.width_cm * dims.effective_width_repeat() as f64;
        let height_total_cm = dims.height_cm * dims.effective_height_repeat() as f64;

        // cm² → m²
        Ok(width_total_cm * height_total_cm / 10_000.0)
    }

    /// 计算耗液量（升）
    pub fn compute_liters_needed(area_m2: f64, liters_per_square_meter: f64) -> f64 {
        area_m2 * liters_per_square_meter
    }

    /// 计算加工成本
    pub fn compute_cost(area_m2: f64, cost_per_square_meter: f64) -> f64 {
        area_m2 * cost_per_square_meter
    }
}
