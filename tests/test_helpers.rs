// ==========================================
// CSV 配置化导入系统 - 集成测试辅助
// ==========================================
// 职责: 测试注册表/数据库/导入器的统一构建
// ==========================================

#![allow(dead_code)]

use csv_profile_import::db::open_sqlite_connection;
use csv_profile_import::importer::{CsvFileParser, CsvImporterImpl};
use csv_profile_import::repository::{
    SqliteImportLogRepository, SqliteProfileRepository, SqliteRecordStore,
};
use csv_profile_import::schema::{FieldDescriptor, ModelDescriptor, SchemaRegistry};
use rusqlite::Connection;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 测试用 party 模型族注册表
///
/// party 档案场景: 名称/编号 + 标识/地址/联系方式子模型
pub fn party_registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.register(
        ModelDescriptor::new("party")
            .with_field(FieldDescriptor::char("name"))
            .with_field(FieldDescriptor::char("code"))
            .with_field(FieldDescriptor::integer("employees"))
            .with_field(FieldDescriptor::one2many(
                "identifiers",
                "party.identifier",
                "party",
            ))
            .with_field(FieldDescriptor::one2many(
                "addresses",
                "party.address",
                "party",
            ))
            .with_field(FieldDescriptor::one2many(
                "contact_mechanisms",
                "party.contact_mechanism",
                "party",
            ))
            .with_field(FieldDescriptor::many2many("categories", "party.category"))
            .with_readonly_states(&["archived"]),
    );
    registry.register(
        ModelDescriptor::new("party.category").with_field(FieldDescriptor::char("name")),
    );
    registry.register(
        ModelDescriptor::new("party.identifier")
            .with_field(FieldDescriptor::char("code"))
            .with_field(FieldDescriptor::char("type"))
            .with_field(FieldDescriptor::many2one("party", "party")),
    );
    registry.register(
        ModelDescriptor::new("party.address")
            .with_field(FieldDescriptor::char("street"))
            .with_field(FieldDescriptor::char("zip"))
            .with_field(FieldDescriptor::char("city"))
            .with_field(FieldDescriptor::many2one("party", "party")),
    );
    registry.register(
        ModelDescriptor::new("party.contact_mechanism")
            .with_field(FieldDescriptor::char("type"))
            .with_field(FieldDescriptor::char("value"))
            .with_field(FieldDescriptor::many2one("party", "party")),
    );
    Arc::new(registry)
}

/// 测试环境: 临时数据库 + 共享连接 + 注册表
pub struct TestEnv {
    pub registry: Arc<SchemaRegistry>,
    pub conn: Arc<Mutex<Connection>>,
    _db_file: NamedTempFile,
}

impl TestEnv {
    pub fn new() -> Self {
        csv_profile_import::logging::init_test();
        let db_file = NamedTempFile::new().expect("创建临时数据库失败");
        let conn = open_sqlite_connection(db_file.path().to_str().expect("数据库路径无效"))
            .expect("打开数据库失败");
        Self {
            registry: party_registry(),
            conn: Arc::new(Mutex::new(conn)),
            _db_file: db_file,
        }
    }

    /// 记录存取(与导入器共享连接, 便于断言)
    pub fn store(&self) -> SqliteRecordStore {
        SqliteRecordStore::from_connection(Arc::clone(&self.conn), Arc::clone(&self.registry))
            .expect("创建 RecordStore 失败")
    }

    pub fn profile_repo(&self) -> SqliteProfileRepository {
        SqliteProfileRepository::from_connection(Arc::clone(&self.conn))
            .expect("创建 ProfileRepository 失败")
    }

    pub fn log_repo(&self) -> SqliteImportLogRepository {
        SqliteImportLogRepository::from_connection(Arc::clone(&self.conn))
            .expect("创建 ImportLogRepository 失败")
    }

    pub fn importer(
        &self,
    ) -> CsvImporterImpl<SqliteRecordStore, SqliteProfileRepository, SqliteImportLogRepository>
    {
        CsvImporterImpl::new(
            self.store(),
            self.profile_repo(),
            self.log_repo(),
            Arc::clone(&self.registry),
            Box::new(CsvFileParser),
        )
    }
}

/// 写入临时 CSV 文件(每个元素一行)
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("创建临时 CSV 失败");
    for line in lines {
        writeln!(file, "{}", line).expect("写入 CSV 失败");
    }
    file
}
