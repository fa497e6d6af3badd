// ==========================================
// CSV 配置化导入系统 - 导入层
// ==========================================
// 职责: 档案驱动的 CSV 导入管道
// 流程: 解析 → 行映射 → 建档/更新决策 → 落库 → 日志
// ==========================================

// 模块声明
pub mod csv_importer_impl;
pub mod csv_importer_trait;
pub mod error;
pub mod file_parser;
pub mod row_mapper;
pub mod upsert_resolver;
pub mod value_parser;

// 重导出核心类型
pub use csv_importer_impl::CsvImporterImpl;
pub use csv_importer_trait::CsvImporter;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvFileParser, FileParser, ParsedRow};
pub use row_mapper::RowMapper;
pub use upsert_resolver::{UpsertDecision, UpsertResolver};
pub use value_parser::ValueParser;
