// ==========================================
// CSV 配置化导入系统 - CLI 主入口
// ==========================================
// 用法: csv-profile-import <schema.json> <profile> <csv 文件> [db 路径]
// ==========================================

use csv_profile_import::config::{ConfigManager, ImportConfigReader};
use csv_profile_import::importer::{CsvFileParser, CsvImporter, CsvImporterImpl};
use csv_profile_import::repository::{
    SqliteImportLogRepository, SqliteProfileRepository, SqliteRecordStore,
};
use csv_profile_import::schema::SchemaRegistry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// 默认数据库路径: 数据目录下的 csv-profile-import/import.db
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("csv-profile-import")
        .join("import.db")
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        anyhow::bail!(
            "用法: {} <schema.json> <profile> <csv 文件> [db 路径]",
            args[0]
        );
    }
    let schema_path = Path::new(&args[1]);
    let profile_name = &args[2];
    let csv_path = Path::new(&args[3]);
    let db_path = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(default_db_path);

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db_path = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("数据库路径不是有效 UTF-8: {}", db_path.display()))?
        .to_string();

    tracing::info!("使用数据库: {}", db_path);

    // 模型注册表来自 JSON 描述文件
    let registry = Arc::new(SchemaRegistry::from_json_file(schema_path)?);

    // 关联策略从配置表读取, 缺省为自动补建
    let config = ConfigManager::new(&db_path)?;
    let link_policy = config.link_policy()?;

    let store =
        SqliteRecordStore::new(&db_path, Arc::clone(&registry))?.with_link_policy(link_policy);
    let profile_repo = SqliteProfileRepository::new(&db_path)?;
    let log_repo = SqliteImportLogRepository::new(&db_path)?;

    let importer = CsvImporterImpl::new(
        store,
        profile_repo,
        log_repo,
        registry,
        Box::new(CsvFileParser),
    );

    let report = importer.import_file(profile_name, csv_path)?;
    tracing::info!(
        run_id = %report.run.run_id,
        total = report.run.total_rows,
        created = report.run.created_rows,
        updated = report.run.updated_rows,
        skipped = report.run.skipped_rows,
        failed = report.run.failed_rows,
        "导入完成"
    );

    if report.run.failed_rows > 0 {
        anyhow::bail!("{} 行导入失败, 详见 import_row_log", report.run.failed_rows);
    }
    Ok(())
}

fn main() -> ExitCode {
    // 初始化日志系统
    csv_profile_import::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", csv_profile_import::APP_NAME);
    tracing::info!("系统版本: {}", csv_profile_import::VERSION);
    tracing::info!("==================================================");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("导入失败: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
