// ==========================================
// 柔印制版生产管理系统 - 统计报表引擎
// ==========================================
// 职责: 月度汇总、液位百分比、余量可用天数估算
// 红线: 只读派生,无状态、无副作用、禁止除零
// ==========================================

use crate::domain::ledger::{MonthlyAggregate, ResourceLedger, UsageEvent};
use chrono::{DateTime, Datelike, Duration, Utc};
use std::collections::HashSet;

// ==========================================
// AggregationReporter - 只读统计
// ==========================================
pub struct AggregationReporter;

impl AggregationReporter {
    /// 当月记账汇总
    ///
    /// # 规则
    /// - 仅统计 created_at 落在 now 所在自然月（UTC）内的事件
    /// - orders_processed 按 order_id 去重计数
    pub fn monthly_stats(events: &[UsageEvent], now: DateTime<Utc>) -> MonthlyAggregate {
        let mut distinct_orders: HashSet<&str> = HashSet::new();
        let mut agg = MonthlyAggregate::empty();

        for event in events {
            if event.created_at.year() != now.year() || event.created_at.month() != now.month() {
                continue;
            }
            distinct_orders.insert(event.order_id.as_str());
            agg.total_area_m2 += event.area_m2;
            agg.total_liters_used += event.liters_consumed;
            agg.total_cost += event.cost_incurred;
        }

        agg.orders_processed = distinct_orders.len() as i64;
        agg
    }

    /// 液位百分比（展示口径,钳制在 [0,100]）
    ///
    /// # 规则
    /// - fill = current_liters / (total_barrels × 200) × 100
    /// - 零容量（尚未入库）按 0 计; 瞬时越界值钳制
    pub fn fill_percentage(ledger: &ResourceLedger) -> f64 {
        let capacity = ledger.max_capacity_liters();
        if capacity <= 0.0 {
            return 0.0;
        }
        (ledger.current_liters / capacity * 100.0).clamp(0.0, 100.0)
    }

    /// 余量可用天数估算
    ///
    /// # 规则
    /// - 取近 window_days 天记账事件的日均耗液作为消耗速率
    /// - 无记账历史或窗口内零消耗 → None（前端显示 N/A,不得除零）
    /// - 余量已为非正 → Some(0.0)
    pub fn estimated_days_remaining(
        ledger: &ResourceLedger,
        events: &[UsageEvent],
        now: DateTime<Utc>,
        window_days: i64,
    ) -> Option<f64> {
        if window_days <= 0 {
            return None;
        }

        let cutoff = now - Duration::days(window_days);
        let consumed_in_window: f64 = events
            .iter()
            .filter(|e| e.created_at > cutoff && e.created_at <= now)
            .map(|e| e.liters_consumed)
            .sum();

        if consumed_in_window <= 0.0 {
            return None;
        }

        if ledger.current_liters <= 0.0 {
            return Some(0.0);
        }

        let daily_rate = consumed_in_window / window_days as f64;
        Some(ledger.current_liters / daily_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(order_id: &str, liters: f64, area: f64, cost: f64, at: DateTime<Utc>) -> UsageEvent {
        UsageEvent {
            event_id: format!("ev-{}", order_id),
            order_id: order_id.to_string(),
            area_m2: area,
            liters_consumed: liters,
            cost_incurred: cost,
            created_at: at,
        }
    }

    #[test]
    fn test_monthly_stats_filters_current_month() {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let in_month_1 = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let in_month_2 = Utc.with_ymd_and_hms(2026, 8, 31, 23, 59, 59).unwrap();
        let last_month = Utc.with_ymd_and_hms(2026, 7, 31, 23, 59, 59).unwrap();
        let last_year = Utc.with_ymd_and_hms(2025, 8, 15, 12, 0, 0).unwrap();

        let events = vec![
            event("PO-1", 7.0, 0.7, 297.1, in_month_1),
            event("PO-2", 3.0, 0.3, 127.3, in_month_2),
            event("PO-3", 99.0, 9.9, 999.0, last_month),
            event("PO-4", 50.0, 5.0, 500.0, last_year),
        ];

        let agg = AggregationReporter::monthly_stats(&events, now);
        assert_eq!(agg.orders_processed, 2);
        assert!((agg.total_liters_used - 10.0).abs() < 1e-9);
        assert!((agg.total_area_m2 - 1.0).abs() < 1e-9);
        assert!((agg.total_cost - 424.4).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_stats_empty_history() {
        let now = Utc::now();
        let agg = AggregationReporter::monthly_stats(&[], now);
        assert_eq!(agg, MonthlyAggregate::empty());
    }

    #[test]
    fn test_fill_percentage_clamped() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::bootstrap(now);

        // 零容量 → 0
        assert_eq!(AggregationReporter::fill_percentage(&ledger), 0.0);

        ledger.total_barrels = 2; // 容量 400L
        ledger.current_liters = 300.0;
        assert!((AggregationReporter::fill_percentage(&ledger) - 75.0).abs() < 1e-9);

        // 瞬时负值钳制为 0
        ledger.current_liters = -50.0;
        assert_eq!(AggregationReporter::fill_percentage(&ledger), 0.0);

        // 瞬时超容钳制为 100
        ledger.current_liters = 500.0;
        assert_eq!(AggregationReporter::fill_percentage(&ledger), 100.0);
    }

    #[test]
    fn test_days_remaining_no_history_is_none() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::bootstrap(now);
        ledger.total_barrels = 1;
        ledger.current_liters = 200.0;

        assert_eq!(
            AggregationReporter::estimated_days_remaining(&ledger, &[], now, 30),
            None
        );
    }

    #[test]
    fn test_days_remaining_from_trailing_window() {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        let mut ledger = ResourceLedger::bootstrap(now);
        ledger.total_barrels = 1;
        ledger.current_liters = 150.0;

        // 窗口内共耗 60L / 30天 → 日均 2L → 150/2 = 75 天
        let events = vec![
            event("PO-1", 40.0, 4.0, 0.0, now - Duration::days(5)),
            event("PO-2", 20.0, 2.0, 0.0, now - Duration::days(20)),
            // 窗口外事件不参与速率
            event("PO-3", 500.0, 50.0, 0.0, now - Duration::days(40)),
        ];

        let days = AggregationReporter::estimated_days_remaining(&ledger, &events, now, 30).unwrap();
        assert!((days - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_days_remaining_empty_tank_is_zero() {
        let now = Utc::now();
        let mut ledger = ResourceLedger::bootstrap(now);
        ledger.total_barrels = 1;
        ledger.current_liters = -10.0;

        let events = vec![event("PO-1", 10.0, 1.0, 0.0, now - Duration::days(1))];
        assert_eq!(
            AggregationReporter::estimated_days_remaining(&ledger, &events, now, 30),
            Some(0.0)
        );
    }
}
