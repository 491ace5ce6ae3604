// ==========================================
// 洗版液台账 API 集成测试
// ==========================================
// 测试目标: 补液累计、参数校验、人工补录防重、状态快照派生指标
// ==========================================


use flexo_plate_mes::domain::ledger::LedgerSettingsPatch;
use flexo_plate_mes::engine::error::WorkflowError;
use flexo_plate_mes::logging;
use flexo_plate_mes::ApiError;

#[tokio::test]
async fn test_refill_accumulates_barrels_and_liters() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    // 引导态: 零库存
    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert_eq!(status.total_barrels, 0);
    assert_eq!(status.current_liters, 0.0);
    assert_eq!(status.metrics.fill_percentage, 0.0);
    assert_eq!(status.metrics.max_capacity_liters, 0.0);

    // refill(3) → 3桶 / 600L
    let status = state.resource_api.refill(3).await.expect("补液应该成功");
    assert_eq!(status.total_barrels, 3);
    assert!((status.current_liters - 600.0).abs() < 1e-9);
    assert!((status.metrics.fill_percentage - 100.0).abs() < 1e-9);

    // 再 refill(2) → 5桶 / 1000L,单调累计无损耗
    let status = state.resource_api.refill(2).await.expect("补液应该成功");
    assert_eq!(status.total_barrels, 5);
    assert!((status.current_liters - 1000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_refill_rejects_nonpositive_count() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    let result = state.resource_api.refill(0).await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidQuantity(0)))
    ));

    let result = state.resource_api.refill(-3).await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidQuantity(-3)))
    ));

    // 台账不变
    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert_eq!(status.total_barrels, 0);
}

#[tokio::test]
async fn test_update_settings_validation() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    // 合法的部分更新
    let status = state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            cost_per_barrel: Some(1800.0),
            liters_per_square_meter: Some(10.0),
            recycling_rate: Some(0.85),
            ..Default::default()
        })
        .await
        .expect("合法参数应该成功");
    assert!((status.cost_per_barrel - 1800.0).abs() < 1e-9);
    assert!((status.liters_per_square_meter - 10.0).abs() < 1e-9);
    assert!((status.recycling_rate - 0.85).abs() < 1e-9);

    // 回收率超出 [0,1] → 拒绝,台账不变
    let result = state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            recycling_rate: Some(1.5),
            cost_per_barrel: Some(9999.0),
            ..Default::default()
        })
        .await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidSetting { .. }))
    ));

    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert!((status.recycling_rate - 0.85).abs() < 1e-9, "台账应保持原值");
    assert!((status.cost_per_barrel - 1800.0).abs() < 1e-9, "整体拒绝,不得部分生效");

    // 负成本 → 拒绝
    let result = state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            cost_per_square_meter: Some(-0.01),
            ..Default::default()
        })
        .await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidSetting { .. }))
    ));
}

#[tokio::test]
async fn test_manual_record_usage_and_duplicate_rejection() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            liters_per_square_meter: Some(10.0),
            cost_per_square_meter: Some(424.44),
            ..Default::default()
        })
        .await
        .expect("配置参数应该成功");
    state.resource_api.refill(1).await.expect("补液应该成功");

    // 人工补录
    let event = state
        .resource_api
        .record_usage("PO-7001", 0.7)
        .await
        .expect("人工补录应该成功");
    assert!((event.liters_consumed - 7.0).abs() < 1e-9);
    assert!((event.cost_incurred - 297.108).abs() < 0.01);

    // 同一订单再次补录 → 拒绝
    let result = state.resource_api.record_usage("PO-7001", 0.3).await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::DuplicateUsage(_)))
    ));

    // 台账只扣减一次: 200 - 7 = 193
    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert!((status.current_liters - 193.0).abs() < 1e-9);
    assert_eq!(status.monthly_stats.orders_processed, 1);
    assert!((status.monthly_stats.total_liters_used - 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_manual_record_usage_input_validation() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    let result = state.resource_api.record_usage("   ", 0.5).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    let result = state.resource_api.record_usage("PO-7002", 0.0).await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidGeometry(_)))
    ));

    let result = state.resource_api.record_usage("PO-7002", -1.0).await;
    assert!(matches!(
        result,
        Err(ApiError::Workflow(WorkflowError::InvalidGeometry(_)))
    ));
}

#[tokio::test]
async fn test_status_metrics_and_days_remaining() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            liters_per_square_meter: Some(10.0),
            cost_per_square_meter: Some(100.0),
            ..Default::default()
        })
        .await
        .expect("配置参数应该成功");
    state.resource_api.refill(2).await.expect("补液应该成功");

    // 无消耗历史 → 可用天数 N/A
    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert_eq!(status.metrics.estimated_days_remaining, None);

    // 产生消耗后 → 按 30 天窗口估算
    state
        .resource_api
        .record_usage("PO-8001", 3.0)
        .await
        .expect("补录应该成功");

    let status = state.resource_api.status().await.expect("状态读取应该成功");
    // 余量 400-30=370L; 窗口内消耗 30L/30天 = 1L/天 → 370 天
    assert!((status.current_liters - 370.0).abs() < 1e-9);
    let days = status
        .metrics
        .estimated_days_remaining
        .expect("有消耗历史应给出估算");
    assert!((days - 370.0).abs() < 1e-6);

    // 液位: 370/400 = 92.5%
    assert!((status.metrics.fill_percentage - 92.5).abs() < 1e-9);
    assert!((status.metrics.max_capacity_liters - 400.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_monthly_stats_aggregation() {
    logging::init_test();
    let (_tmp, state) = test_helpers::create_test_state();

    state
        .resource_api
        .update_settings(LedgerSettingsPatch {
            liters_per_square_meter: Some(10.0),
            cost_per_square_meter: Some(100.0),
            ..Default::default()
        })
        .await
        .expect("配置参数应该成功");
    state.resource_api.refill(5).await.expect("补液应该成功");

    state
        .resource_api
        .record_usage("PO-9001", 1.0)
        .await
        .expect("补录应该成功");
    state
        .resource_api
        .record_usage("PO-9002", 2.5)
        .await
        .expect("补录应该成功");

    let status = state.resource_api.status().await.expect("状态读取应该成功");
    assert_eq!(status.monthly_stats.orders_processed, 2);
    assert!((status.monthly_stats.total_area_m2 - 3.5).abs() < 1e-9);
    assert!((status.monthly_stats.total_liters_used - 35.0).abs() < 1e-9);
    assert!((status.monthly_stats.total_cost - 350.0).abs() < 1e-9);
}
