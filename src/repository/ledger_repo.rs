// ==========================================
// 柔印制版生产管理系统 - 洗版液台账仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: resource_ledger（单行表 + revision 乐观锁）/ usage_event 表
// ==========================================

use crate::domain::ledger::{ResourceLedger, UsageEvent, LEDGER_ID};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ResourceLedgerRepository - 台账仓储
// ==========================================

/// 台账仓储
/// 职责: resource_ledger 单行表的读取与乐观锁更新
pub struct ResourceLedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceLedgerRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 初始化台账表并植入零库存单行（幂等）
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS resource_ledger (
                ledger_id                 TEXT PRIMARY KEY,
                total_barrels             INTEGER NOT NULL DEFAULT 0,
                current_liters            REAL NOT NULL DEFAULT 0,
                cost_per_barrel           REAL NOT NULL DEFAULT 0,
                recycling_cost_per_barrel REAL NOT NULL DEFAULT 0,
                cost_per_square_meter     REAL NOT NULL DEFAULT 0,
                liters_per_square_meter   REAL NOT NULL DEFAULT 0,
                recycling_rate            REAL NOT NULL DEFAULT 0,
                revision                  INTEGER NOT NULL DEFAULT 0,
                updated_at                TEXT NOT NULL
            );
            "#,
        )?;

        let bootstrap = ResourceLedger::bootstrap(Utc::now());
        conn.execute(
            r#"
            INSERT OR IGNORE INTO resource_ledger (
                ledger_id, total_barrels, current_liters,
                cost_per_barrel, recycling_cost_per_barrel,
                cost_per_square_meter, liters_per_square_meter, recycling_rate,
                revision, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                bootstrap.ledger_id,
                bootstrap.total_barrels,
                bootstrap.current_liters,
                bootstrap.cost_per_barrel,
                bootstrap.recycling_cost_per_barrel,
                bootstrap.cost_per_square_meter,
                bootstrap.liters_per_square_meter,
                bootstrap.recycling_rate,
                bootstrap.revision,
                bootstrap.updated_at,
            ],
        )?;

        Ok(())
    }

    /// 读取台账（单行,固定主键 main）
    pub fn load(&self) -> RepositoryResult<ResourceLedger> {
        let conn = self.get_conn()?;

        conn.query_row(
            r#"
            SELECT ledger_id, total_barrels, current_liters,
                   cost_per_barrel, recycling_cost_per_barrel,
                   cost_per_square_meter, liters_per_square_meter, recycling_rate,
                   revision, updated_at
            FROM resource_ledger
            WHERE ledger_id = ?1
            "#,
            params![LEDGER_ID],
            |row| {
                Ok(ResourceLedger {
                    ledger_id: row.get(0)?,
                    total_barrels: row.get(1)?,
                    current_liters: row.get(2)?,
                    cost_per_barrel: row.get(3)?,
                    recycling_cost_per_barrel: row.get(4)?,
                    cost_per_square_meter: row.get(5)?,
                    liters_per_square_meter: row.get(6)?,
                    recycling_rate: row.get(7)?,
                    revision: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "ResourceLedger".to_string(),
            id: LEDGER_ID.to_string(),
        })
    }

    /// 带乐观锁更新台账
    ///
    /// # 规则
    /// - `ledger.revision` 必须等于库内当前值,否则 OptimisticLockFailure
    /// - 成功后库内 revision + 1
    pub fn update_with_revision(&self, ledger: &ResourceLedger) -> RepositoryResult<ResourceLedger> {
        let conn = self.get_conn()?;

        let affected = conn.execute(
            r#"
            UPDATE resource_ledger
               SET total_barrels = ?1, current_liters = ?2,
                   cost_per_barrel = ?3, recycling_cost_per_barrel = ?4,
                   cost_per_square_meter = ?5, liters_per_square_meter = ?6,
                   recycling_rate = ?7, updated_at = ?8, revision = revision + 1
             WHERE ledger_id = ?9 AND revision = ?10
            "#,
            params![
                ledger.total_barrels,
                ledger.current_liters,
                ledger.cost_per_barrel,
                ledger.recycling_cost_per_barrel,
                ledger.cost_per_square_meter,
                ledger.liters_per_square_meter,
                ledger.recycling_rate,
                ledger.updated_at,
                ledger.ledger_id,
                ledger.revision,
            ],
        )?;

        if affected == 0 {
            let actual: Option<i32> = conn
                .query_row(
                    "SELECT revision FROM resource_ledger WHERE ledger_id = ?1",
                    params![ledger.ledger_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    entity: "ResourceLedger".to_string(),
                    id: ledger.ledger_id.clone(),
                    expected: ledger.revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "ResourceLedger".to_string(),
                    id: ledger.ledger_id.clone(),
                }),
            };
        }

        let mut updated = ledger.clone();
        updated.revision += 1;
        Ok(updated)
    }
}

// ==========================================
// UsageEventRepository - 记账事件仓储
// ==========================================

/// 记账事件仓储
/// 职责: usage_event 只增表的追加与查询; order_id 唯一约束兜底防重
pub struct UsageEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UsageEventRepository {
    /// 从共享连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 初始化记账事件表（幂等）
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS usage_event (
                event_id        TEXT PRIMARY KEY,
                order_id        TEXT NOT NULL UNIQUE,
                area_m2         REAL NOT NULL,
                liters_consumed REAL NOT NULL,
                cost_incurred   REAL NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_usage_event_created_at
                ON usage_event(created_at);
            "#,
        )?;
        Ok(())
    }

    /// 追加记账事件（order_id 重复时返回 UniqueConstraintViolation）
    pub fn insert(&self, event: &UsageEvent) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO usage_event (
                event_id, order_id, area_m2, liters_consumed, cost_incurred, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                event.event_id,
                event.order_id,
                event.area_m2,
                event.liters_consumed,
                event.cost_incurred,
                event.created_at,
            ],
        )?;

        Ok(())
    }

    /// 按订单号查询记账事件
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Option<UsageEvent>> {
        let conn = self.get_conn()?;

        let event = conn
            .query_row(
                r#"
                SELECT event_id, order_id, area_m2, liters_consumed, cost_incurred, created_at
                FROM usage_event
                WHERE order_id = ?1
                "#,
                params![order_id],
                Self::map_row,
            )
            .optional()?;

        Ok(event)
    }

    /// 查询指定时刻之后的记账事件（报表窗口）
    pub fn list_since(&self, cutoff: DateTime<Utc>) -> RepositoryResult<Vec<UsageEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT event_id, order_id, area_m2, liters_consumed, cost_incurred, created_at
            FROM usage_event
            WHERE created_at > ?1
            ORDER BY created_at
            "#,
        )?;

        let events = stmt
            .query_map(params![cutoff], Self::map_row)?
            .collect::<SqliteResult<Vec<UsageEvent>>>()?;

        Ok(events)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<UsageEvent> {
        Ok(UsageEvent {
            event_id: row.get(0)?,
            order_id: row.get(1)?,
            area_m2: row.get(2)?,
            liters_consumed: row.get(3)?,
            cost_incurred: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}
