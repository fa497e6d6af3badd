// ==========================================
// CSV 配置化导入系统 - 领域层
// ==========================================
// 职责: 实体与共享类型定义, 不含业务逻辑
// ==========================================

pub mod log;
pub mod profile;
pub mod record;
pub mod types;

// 重导出核心类型
pub use log::{ImportReport, ImportRun, RowOutcome};
pub use profile::{ColumnMapping, CsvDialect, ImportProfile};
pub use record::{FieldValue, MappedValue, RecordPayload};
pub use types::{
    CharacterEncoding, DecimalSeparator, FieldKind, LinkPolicy, RowStatus, Separator,
    ThousandsSeparator,
};
