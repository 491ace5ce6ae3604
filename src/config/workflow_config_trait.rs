// ==========================================
// 柔印制版生产管理系统 - 工艺配置读取 Trait
// ==========================================
// 职责: 定义工作流/记账模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取错误（跨 await 传递,需 Send + Sync）
pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// WorkflowConfigReader Trait
// ==========================================
// 用途: 工作流门面与统计报表所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait WorkflowConfigReader: Send + Sync {
    /// 获取工艺模板的子工序代码列表（模板顺序）
    ///
    /// # 参数
    /// - template_id: 工艺模板 ID（产品线）
    ///
    /// # 返回
    /// - Some(Vec<String>): 模板已配置
    /// - None: 模板不存在
    ///
    /// # 默认值
    /// - "standard" 模板未落库时返回内置九工序模板
    async fn get_workflow_template(
        &self,
        template_id: &str,
    ) -> Result<Option<Vec<String>>, ConfigError>;

    /// 获取默认工艺模板 ID
    ///
    /// # 默认值
    /// - "standard"
    async fn get_default_template_id(&self) -> Result<String, ConfigError>;

    /// 获取触发耗液记账的子工序代码
    ///
    /// # 默认值
    /// - "WASHOUT"
    async fn get_trigger_process_code(&self) -> Result<String, ConfigError>;

    /// 获取余量可用天数估算的回溯窗口（天）
    ///
    /// # 默认值
    /// - 30
    async fn get_consumption_window_days(&self) -> Result<i64, ConfigError>;
}
