// ==========================================
// CSV 配置化导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 档案驱动的 CSV 建档/更新引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 模型注册表层 - 结构描述与档案校验
pub mod schema;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 管道与决策
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CharacterEncoding, ColumnMapping, CsvDialect, DecimalSeparator, FieldKind, FieldValue,
    ImportProfile, ImportReport, ImportRun, LinkPolicy, MappedValue, RecordPayload, RowOutcome,
    RowStatus, Separator, ThousandsSeparator,
};

// 模型注册表
pub use schema::{
    validate_profile, FieldDescriptor, ModelDescriptor, ProfileError, RelationInfo, SchemaRegistry,
};

// 导入管道
pub use importer::{
    CsvFileParser, CsvImporter, CsvImporterImpl, FileParser, ImportError, ParsedRow, RowMapper,
    UpsertDecision, UpsertResolver,
};

// 仓储
pub use repository::{
    Domain, ImportLogRepository, ProfileRepository, RecordId, RecordStore,
    SqliteImportLogRepository, SqliteProfileRepository, SqliteRecordStore, StoreError,
};

// 配置
pub use config::{ConfigManager, ImportConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "CSV 配置化导入系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
