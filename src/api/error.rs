// ==========================================
// 柔印制版生产管理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Engine错误为用户友好的错误消息
// 约束: 所有错误信息必须包含显式原因（可解释性）
// ==========================================

use crate::engine::error::WorkflowError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误（引擎层错误分类原样透传,供调用方精确匹配）
    // ==========================================
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                entity,
                id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "{}(id={})已被其他用户修改（期望revision={}，实际revision={}）",
                entity, id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        // NotFound错误转换
        let repo_err = RepositoryError::NotFound {
            entity: "ProductionOrder".to_string(),
            id: "PO-1001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductionOrder"));
                assert!(msg.contains("PO-1001"));
            }
            _ => panic!("Expected NotFound"),
        }

        // OptimisticLockFailure转换
        let repo_err = RepositoryError::OptimisticLockFailure {
            entity: "ResourceLedger".to_string(),
            id: "main".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::OptimisticLockFailure(msg) => {
                assert!(msg.contains("main"));
                assert!(msg.contains("已被其他用户修改"));
            }
            _ => panic!("Expected OptimisticLockFailure"),
        }
    }

    #[test]
    fn test_workflow_error_passthrough() {
        let api_err: ApiError = WorkflowError::DuplicateUsage("PO-1001".to_string()).into();
        assert!(matches!(
            api_err,
            ApiError::Workflow(WorkflowError::DuplicateUsage(_))
        ));
    }
}
