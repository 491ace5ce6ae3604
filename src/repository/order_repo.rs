// ==========================================
// 柔印制版生产管理系统 - 订单数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: production_order / order_stage / order_sub_process 表
// ==========================================

use crate::domain::order::{PlateDimensions, ProductionOrder, StageState, SubProcessState};
use crate::domain::types::{OrderStatus, StageKind, StageStatus, SubProcessStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================

/// 订单仓储
/// 职责: production_order 及其阶段/子工序明细表的存取
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
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

    /// 初始化订单相关表（幂等）
    pub fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS production_order (
                order_id       TEXT PRIMARY KEY,
                client_name    TEXT,
                product_name   TEXT,
                template_id    TEXT NOT NULL,
                status         TEXT NOT NULL,
                width_cm       REAL,
                height_cm      REAL,
                width_repeat   INTEGER,
                height_repeat  INTEGER,
                usage_recorded INTEGER NOT NULL DEFAULT 0,
                revision       INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL,
                updated_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS order_stage (
                order_id     TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
                stage_code   TEXT NOT NULL,
                status       TEXT NOT NULL,
                completed_at TEXT,
                PRIMARY KEY (order_id, stage_code)
            );

            CREATE TABLE IF NOT EXISTS order_sub_process (
                order_id     TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
                seq_no       INTEGER NOT NULL,
                process_code TEXT NOT NULL,
                status       TEXT NOT NULL,
                completed_at TEXT,
                PRIMARY KEY (order_id, process_code)
            );

            CREATE INDEX IF NOT EXISTS idx_production_order_status
                ON production_order(status);
            "#,
        )?;
        Ok(())
    }

    /// 登记新订单（含阶段/子工序明细,同一事务）
    pub fn insert(&self, order: &ProductionOrder) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO production_order (
                order_id, client_name, product_name, template_id, status,
                width_cm, height_cm, width_repeat, height_repeat,
                usage_recorded, revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                order.order_id,
                order.client_name,
                order.product_name,
                order.template_id,
                order.status.to_db_str(),
                order.dimensions.map(|d| d.width_cm),
                order.dimensions.map(|d| d.height_cm),
                order.dimensions.and_then(|d| d.width_repeat),
                order.dimensions.and_then(|d| d.height_repeat),
                order.usage_recorded,
                order.revision,
                order.created_at,
                order.updated_at,
            ],
        )?;

        Self::insert_details(&tx, order)?;
        tx.commit()?;
        Ok(())
    }

    /// 按订单号查询完整订单
    ///
    /// # 返回
    /// - Ok(Some(ProductionOrder)): 找到订单（含阶段/子工序明细）
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;

        let head = conn
            .query_row(
                r#"
                SELECT order_id, client_name, product_name, template_id, status,
                       width_cm, height_cm, width_repeat, height_repeat,
                       usage_recorded, revision, created_at, updated_at
                FROM production_order
                WHERE order_id = ?1
                "#,
                params![order_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, Option<i32>>(7)?,
                        row.get::<_, Option<i32>>(8)?,
                        row.get::<_, bool>(9)?,
                        row.get::<_, i32>(10)?,
                        row.get::<_, DateTime<Utc>>(11)?,
                        row.get::<_, DateTime<Utc>>(12)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            order_id,
            client_name,
            product_name,
            template_id,
            status_raw,
            width_cm,
            height_cm,
            width_repeat,
            height_repeat,
            usage_recorded,
            revision,
            created_at,
            updated_at,
        )) = head
        else {
            return Ok(None);
        };

        let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "production_order.status".to_string(),
                message: format!("无法解析状态值 '{}'", status_raw),
            }
        })?;

        let dimensions = match (width_cm, height_cm) {
            (Some(w), Some(h)) => Some(PlateDimensions {
                width_cm: w,
                height_cm: h,
                width_repeat,
                height_repeat,
            }),
            _ => None,
        };

        let stages = Self::load_stages(&conn, &order_id)?;
        let sub_processes = Self::load_sub_processes(&conn, &order_id)?;

        Ok(Some(ProductionOrder {
            order_id,
            client_name,
            product_name,
            template_id,
            status,
            stages,
            sub_processes,
            dimensions,
            usage_recorded,
            revision,
            created_at,
            updated_at,
        }))
    }

    /// 按状态查询订单号列表（status=None 时返回全部）
    pub fn list_ids(&self, status: Option<OrderStatus>) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;

        let ids = match status {
            Some(s) => {
                let mut stmt = conn.prepare(
                    "SELECT order_id FROM production_order WHERE status = ?1 ORDER BY created_at",
                )?;
                let rows = stmt.query_map(params![s.to_db_str()], |row| row.get::<_, String>(0))?;
                rows.collect::<SqliteResult<Vec<String>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT order_id FROM production_order ORDER BY created_at")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<SqliteResult<Vec<String>>>()?
            }
        };

        Ok(ids)
    }

    /// 带乐观锁更新订单（含明细重写,同一事务）
    ///
    /// # 规则
    /// - `order.revision` 必须等于库内当前值,否则 OptimisticLockFailure
    /// - 成功后库内 revision + 1
    ///
    /// # 返回
    /// - Ok(ProductionOrder): 更新后的订单（revision 已 +1）
    pub fn update_with_revision(
        &self,
        order: &ProductionOrder,
    ) -> RepositoryResult<ProductionOrder> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let affected = tx.execute(
            r#"
            UPDATE production_order
               SET client_name = ?1, product_name = ?2, template_id = ?3, status = ?4,
                   width_cm = ?5, height_cm = ?6, width_repeat = ?7, height_repeat = ?8,
                   usage_recorded = ?9, updated_at = ?10, revision = revision + 1
             WHERE order_id = ?11 AND revision = ?12
            "#,
            params![
                order.client_name,
                order.product_name,
                order.template_id,
                order.status.to_db_str(),
                order.dimensions.map(|d| d.width_cm),
                order.dimensions.map(|d| d.height_cm),
                order.dimensions.and_then(|d| d.width_repeat),
                order.dimensions.and_then(|d| d.height_repeat),
                order.usage_recorded,
                order.updated_at,
                order.order_id,
                order.revision,
            ],
        )?;

        if affected == 0 {
            // 判断是记录不存在还是 revision 冲突
            let actual: Option<i32> = tx
                .query_row(
                    "SELECT revision FROM production_order WHERE order_id = ?1",
                    params![order.order_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    entity: "ProductionOrder".to_string(),
                    id: order.order_id.clone(),
                    expected: order.revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "ProductionOrder".to_string(),
                    id: order.order_id.clone(),
                }),
            };
        }

        // 明细表整体重写
        tx.execute(
            "DELETE FROM order_stage WHERE order_id = ?1",
            params![order.order_id],
        )?;
        tx.execute(
            "DELETE FROM order_sub_process WHERE order_id = ?1",
            params![order.order_id],
        )?;
        Self::insert_details(&tx, order)?;

        tx.commit()?;

        let mut updated = order.clone();
        updated.revision += 1;
        Ok(updated)
    }

    // ==========================================
    // 内部: 明细表读写
    // ==========================================

    fn insert_details(tx: &rusqlite::Transaction<'_>, order: &ProductionOrder) -> RepositoryResult<()> {
        for stage in &order.stages {
            tx.execute(
                r#"
                INSERT INTO order_stage (order_id, stage_code, status, completed_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    order.order_id,
                    stage.stage.to_db_str(),
                    stage.status.to_db_str(),
                    stage.completed_at,
                ],
            )?;
        }

        for proc in &order.sub_processes {
            tx.execute(
                r#"
                INSERT INTO order_sub_process (order_id, seq_no, process_code, status, completed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    order.order_id,
                    proc.seq_no,
                    proc.code,
                    proc.status.to_db_str(),
                    proc.completed_at,
                ],
            )?;
        }

        Ok(())
    }

    fn load_stages(conn: &Connection, order_id: &str) -> RepositoryResult<Vec<StageState>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT stage_code, status, completed_at
            FROM order_stage
            WHERE order_id = ?1
            "#,
        )?;

        let raw = stmt
            .query_map(params![order_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<DateTime<Utc>>>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut stages = Vec::with_capacity(raw.len());
        for (stage_raw, status_raw, completed_at) in raw {
            let stage = StageKind::parse(&stage_raw).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "order_stage.stage_code".to_string(),
                    message: format!("无法解析阶段值 '{}'", stage_raw),
                }
            })?;
            let status = StageStatus::parse(&status_raw).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "order_stage.status".to_string(),
                    message: format!("无法解析阶段状态 '{}'", status_raw),
                }
            })?;
            stages.push(StageState {
                stage,
                status,
                completed_at,
            });
        }

        // 固定按生产顺序返回
        stages.sort_by_key(|s| {
            StageKind::all()
                .iter()
                .position(|k| *k == s.stage)
                .unwrap_or(usize::MAX)
        });
        Ok(stages)
    }

    fn load_sub_processes(
        conn: &Connection,
        order_id: &str,
    ) -> RepositoryResult<Vec<SubProcessState>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT seq_no, process_code, status, completed_at
            FROM order_sub_process
            WHERE order_id = ?1
            ORDER BY seq_no
            "#,
        )?;

        let raw = stmt
            .query_map(params![order_id], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<DateTime<Utc>>>(3)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut procs = Vec::with_capacity(raw.len());
        for (seq_no, code, status_raw, completed_at) in raw {
            let status = SubProcessStatus::parse(&status_raw).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "order_sub_process.status".to_string(),
                    message: format!("无法解析子工序状态 '{}'", status_raw),
                }
            })?;
            procs.push(SubProcessState {
                code,
                seq_no,
                status,
                completed_at,
            });
        }

        Ok(procs)
    }
}
