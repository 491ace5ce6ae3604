// ==========================================
// 柔印制版生产管理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::workflow_config_trait::{ConfigError, WorkflowConfigReader};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 默认工艺模板 ID
pub const DEFAULT_TEMPLATE_ID: &str = "standard";

/// 内置标准九工序制版模板（standard 模板未落库时的默认值）
pub const STANDARD_SUB_PROCESSES: [&str; 9] = [
    "POSITIONING",
    "BACK_EXPOSURE",
    "LASER_IMAGING",
    "MAIN_EXPOSURE",
    "WASHOUT",
    "DRYING",
    "POST_EXPOSURE",
    "UVC_EXPOSURE",
    "FINISHING",
];

// ==========================================
// 配置键
// ==========================================
const KEY_DEFAULT_TEMPLATE_ID: &str = "workflow/default_template_id";
const KEY_TRIGGER_PROCESS: &str = "consumption/trigger_process";
const KEY_WINDOW_DAYS: &str = "consumption/window_days";

fn template_key(template_id: &str) -> String {
    format!("workflow_template/{}", template_id)
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }
        Ok(Self { conn })
    }

    /// 初始化配置表并植入 global scope（幂等）
    pub fn ensure_schema(&self) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_scope (
                scope_id   TEXT PRIMARY KEY,
                scope_type TEXT NOT NULL,
                scope_key  TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(scope_type, scope_key)
            );

            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id   TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
                key        TEXT NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;

        conn.execute(
            r#"
            INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
            VALUES ('global', 'GLOBAL', 'global')
            "#,
            [],
        )?;

        Ok(())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 落库一个工艺模板（JSON 数组,模板顺序）
    pub fn put_workflow_template(
        &self,
        template_id: &str,
        sub_processes: &[String],
    ) -> Result<(), ConfigError> {
        let json = serde_json::to_string(sub_processes)?;
        self.set_global_config_value(&template_key(template_id), &json)
    }
}

// ==========================================
// WorkflowConfigReader 实现
// ==========================================
#[async_trait]
impl WorkflowConfigReader for ConfigManager {
    async fn get_workflow_template(
        &self,
        template_id: &str,
    ) -> Result<Option<Vec<String>>, ConfigError> {
        match self.get_config_value(&template_key(template_id))? {
            Some(raw) => {
                let codes: Vec<String> = serde_json::from_str(&raw)?;
                Ok(Some(codes))
            }
            // standard 模板未落库时使用内置默认
            None if template_id == DEFAULT_TEMPLATE_ID => Ok(Some(
                STANDARD_SUB_PROCESSES.iter().map(|s| s.to_string()).collect(),
            )),
            None => Ok(None),
        }
    }

    async fn get_default_template_id(&self) -> Result<String, ConfigError> {
        self.get_config_or_default(KEY_DEFAULT_TEMPLATE_ID, DEFAULT_TEMPLATE_ID)
    }

    async fn get_trigger_process_code(&self) -> Result<String, ConfigError> {
        self.get_config_or_default(KEY_TRIGGER_PROCESS, "WASHOUT")
    }

    async fn get_consumption_window_days(&self) -> Result<i64, ConfigError> {
        let raw = self.get_config_or_default(KEY_WINDOW_DAYS, "30")?;
        let days: i64 = raw
            .trim()
            .parse()
            .map_err(|e| format!("{} 配置值 '{}' 解析失败: {}", KEY_WINDOW_DAYS, raw, e))?;
        Ok(days)
    }
}
