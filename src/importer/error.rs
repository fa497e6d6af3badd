// ==========================================
// CSV 配置化导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::StoreError;
use crate::schema::validate::ProfileError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("字符编码转换失败: 文件不是有效的 {encoding}")]
    EncodingError { encoding: String },

    // ===== 档案错误 =====
    #[error("导入档案不存在: {0}")]
    ProfileNotFound(String),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    // ===== 数据映射错误 =====
    #[error("字段映射失败 (行 {row}): {message}")]
    MappingError { row: usize, message: String },

    #[error("列位置越界 (行 {row}): 位置 {position}, 行宽 {width}")]
    ColumnOutOfRange {
        row: usize,
        position: usize,
        width: usize,
    },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("整数超出范围 (行 {row}, 字段 {field}): 值 {value} 必须在 -2147483648 和 2147483647 之间")]
    IntegerOutOfRange {
        row: usize,
        field: String,
        value: String,
    },

    #[error("日期格式错误 (行 {row}, 字段 {field}): 期望 {format}, 实际 {value}")]
    DateFormatError {
        row: usize,
        field: String,
        value: String,
        format: String,
    },

    // ===== 匹配与写入错误 =====
    #[error("匹配域构建失败 (行 {row}, 字段 {field}): {message}")]
    DomainBuildError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("记录状态禁止修改 (行 {row}): {model} id={record_id} state={state}")]
    WritePermissionError {
        row: usize,
        model: String,
        record_id: i64,
        state: String,
    },

    #[error("查找键匹配到多条记录 (行 {row}): {model} 共 {matches} 条")]
    DuplicateMatchError {
        row: usize,
        model: String,
        matches: usize,
    },

    // ===== 存取错误 =====
    #[error(transparent)]
    Store(#[from] StoreError),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
