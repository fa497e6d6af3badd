// ==========================================
// CSV 配置化导入系统 - 数据仓储层
// ==========================================
// 职责: 数据访问, 不含业务规则
// ==========================================

pub mod error;
pub mod import_log_repo;
pub mod profile_repo;
pub mod record_store;
pub mod sqlite_record_store;

pub use error::{StoreError, StoreResult};
pub use import_log_repo::{ImportLogRepository, SqliteImportLogRepository};
pub use profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use record_store::{Domain, RecordId, RecordStore};
pub use sqlite_record_store::SqliteRecordStore;
