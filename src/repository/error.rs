// ==========================================
// CSV 配置化导入系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    // ===== 结构错误 =====
    #[error("模型未注册: {0}")]
    UnknownModel(String),

    #[error("字段未注册: {model}.{field}")]
    UnknownField { model: String, field: String },

    // ===== 记录错误 =====
    #[error("记录未找到: {model} id={id}")]
    NotFound { model: String, id: i64 },

    #[error("记录状态禁止修改: {model} id={id} state={state}")]
    WriteForbidden {
        model: String,
        id: i64,
        state: String,
    },

    #[error("关系引用无匹配: {model}.{field} = {value}")]
    UnresolvedLink {
        model: String,
        field: String,
        value: String,
    },

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("数据库事务失败: {0}")]
    TransactionError(String),

    #[error("数据库查询失败: {0}")]
    QueryError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    // ===== 数据错误 =====
    #[error("档案列位置格式错误: {0} (应为逗号分隔的整数)")]
    ColumnFormatError(String),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::QueryError(err.to_string())
    }
}

/// Result 类型别名
pub type StoreResult<T> = Result<T, StoreError>;
