// ==========================================
// 导入流水线集成测试
// ==========================================
// 覆盖: 档案加载 → CSV 解析 → 行映射 → 落库 → 运行日志
// ==========================================

mod test_helpers;

use csv_profile_import::domain::{ColumnMapping, FieldValue, ImportProfile, RowStatus};
use csv_profile_import::importer::CsvImporter;
use csv_profile_import::repository::{ImportLogRepository, ProfileRepository, RecordStore};
use test_helpers::{write_csv, TestEnv};

fn name_only_profile() -> ImportProfile {
    ImportProfile::new("party-name", "party").with_column(ColumnMapping::scalar(0, "name"))
}

#[test]
fn test_single_column_creates_party() {
    let env = TestEnv::new();
    let importer = env.importer();
    let csv = write_csv(&["name", "Zikzakmedia"]);

    let report = importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("导入失败");

    assert_eq!(report.run.total_rows, 1);
    assert_eq!(report.run.created_rows, 1);
    assert_eq!(report.run.failed_rows, 0);

    let store = env.store();
    assert_eq!(store.count("party").unwrap(), 1);
    let matches = store
        .search(
            "party",
            &vec![("name".to_string(), FieldValue::Char("Zikzakmedia".into()))],
        )
        .unwrap();
    assert_eq!(matches.len(), 1, "应当恰好有一条 Zikzakmedia");
}

#[test]
fn test_header_row_excluded_from_data() {
    let env = TestEnv::new();
    let importer = env.importer();
    // 表头行不参与导入, 也不计入 total_rows
    let csv = write_csv(&["name", "Alpha SL", "Beta SA"]);

    let report = importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("导入失败");

    assert_eq!(report.run.total_rows, 2);
    assert_eq!(env.store().count("party").unwrap(), 2);
}

#[test]
fn test_no_header_dialect_imports_first_row() {
    let env = TestEnv::new();
    let importer = env.importer();
    let mut profile = name_only_profile();
    profile.dialect.header = false;
    let csv = write_csv(&["Alpha SL", "Beta SA"]);

    let report = importer
        .import_with_profile(&profile, csv.path())
        .expect("导入失败");

    assert_eq!(report.run.total_rows, 2);
    assert_eq!(report.run.created_rows, 2);
}

#[test]
fn test_relational_columns_fan_out_children() {
    let env = TestEnv::new();
    let importer = env.importer();
    // 街道/邮编各占一列, 各自展开为一条地址
    let profile = ImportProfile::new("party-full", "party")
        .with_column(ColumnMapping::scalar(0, "name"))
        .with_column(ColumnMapping::relational(1, "identifiers", "code"))
        .with_column(ColumnMapping::relational(2, "addresses", "street"))
        .with_column(ColumnMapping::relational(3, "addresses", "zip"))
        .with_column(ColumnMapping::relational(4, "contact_mechanisms", "type"))
        .with_column(ColumnMapping::relational(5, "contact_mechanisms", "value"));
    let csv = write_csv(&[
        "name;identifier;street;zip;type;value",
        "Zikzakmedia;ES123456789;St. Miquel 45;08720;email;info@zikzakmedia.com",
    ]);

    let report = importer
        .import_with_profile(&profile, csv.path())
        .expect("导入失败");

    assert_eq!(report.run.created_rows, 1);
    let store = env.store();
    assert_eq!(store.count("party").unwrap(), 1);
    assert_eq!(store.count("party.identifier").unwrap(), 1);
    assert_eq!(store.count("party.address").unwrap(), 2);
    assert_eq!(store.count("party.contact_mechanism").unwrap(), 2);

    // 子记录必须挂到父记录上
    let party_id = store
        .search(
            "party",
            &vec![("name".to_string(), FieldValue::Char("Zikzakmedia".into()))],
        )
        .unwrap()[0];
    let addresses = store
        .search(
            "party.address",
            &vec![("party".to_string(), FieldValue::Integer(party_id))],
        )
        .unwrap();
    assert_eq!(addresses.len(), 2);
}

#[test]
fn test_many2many_column_fills_junction_table() {
    let env = TestEnv::new();
    let importer = env.importer();
    let profile = ImportProfile::new("party-tagged", "party")
        .with_column(ColumnMapping::scalar(0, "name"))
        .with_column(ColumnMapping::relational(1, "categories", "name"));
    let csv = write_csv(&["name;category", "Zikzakmedia;Media"]);

    let report = importer
        .import_with_profile(&profile, csv.path())
        .expect("导入失败");

    assert_eq!(report.run.created_rows, 1);
    let store = env.store();
    assert_eq!(store.count("party").unwrap(), 1);
    assert_eq!(store.count("party.category").unwrap(), 1);
    // 中间表恰好有一条父子关联
    assert_eq!(store.count("party__categories").unwrap(), 1);

    let category_id = store
        .search(
            "party.category",
            &vec![("name".to_string(), FieldValue::Char("Media".into()))],
        )
        .unwrap();
    assert_eq!(category_id.len(), 1);
}

#[test]
fn test_no_search_keys_always_creates() {
    let env = TestEnv::new();
    let importer = env.importer();
    let csv = write_csv(&["name", "Zikzakmedia"]);

    importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("第一次导入失败");
    importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("第二次导入失败");

    // 无查找键时每行都新建, 不做匹配
    assert_eq!(env.store().count("party").unwrap(), 2);
}

#[test]
fn test_failed_row_does_not_abort_run() {
    let env = TestEnv::new();
    let importer = env.importer();
    let profile = ImportProfile::new("party-emp", "party")
        .with_column(ColumnMapping::scalar(0, "name"))
        .with_column(ColumnMapping::scalar(1, "employees"));
    let csv = write_csv(&[
        "name;employees",
        "Alpha SL;12",
        "Broken SA;not-a-number",
        "Gamma SA;7",
    ]);

    let report = importer
        .import_with_profile(&profile, csv.path())
        .expect("导入失败");

    assert_eq!(report.run.total_rows, 3);
    assert_eq!(report.run.created_rows, 2);
    assert_eq!(report.run.failed_rows, 1);
    assert_eq!(env.store().count("party").unwrap(), 2);

    // 失败行带错误消息与原始单元格快照
    let failed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.status == RowStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].row_number, 3);
    assert!(failed[0].message.is_some());
    assert!(failed[0].raw_row.contains("not-a-number"));
}

#[test]
fn test_import_file_loads_saved_profile() {
    let env = TestEnv::new();
    env.profile_repo()
        .save(&name_only_profile())
        .expect("保存档案失败");
    let importer = env.importer();
    let csv = write_csv(&["name", "Zikzakmedia"]);

    let report = importer
        .import_file("party-name", csv.path())
        .expect("导入失败");

    assert_eq!(report.run.profile_name, "party-name");
    assert_eq!(report.run.created_rows, 1);
}

#[test]
fn test_missing_profile_is_rejected() {
    let env = TestEnv::new();
    let importer = env.importer();
    let csv = write_csv(&["name", "Zikzakmedia"]);

    let result = importer.import_file("no-such-profile", csv.path());
    assert!(result.is_err());
}

#[test]
fn test_run_and_outcomes_persisted() {
    let env = TestEnv::new();
    let importer = env.importer();
    let csv = write_csv(&["name", "Alpha SL", "Beta SA"]);

    let report = importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("导入失败");

    let log_repo = env.log_repo();
    let run = log_repo
        .get_run(&report.run.run_id)
        .expect("查询运行失败")
        .expect("运行批次未落库");
    assert_eq!(run.total_rows, 2);
    assert_eq!(run.created_rows, 2);
    assert!(run.finished_at.is_some());

    let outcomes = log_repo
        .outcomes_for_run(&report.run.run_id)
        .expect("查询行日志失败");
    assert_eq!(outcomes.len(), 2);
    // 行号按文件物理行计, 表头占第 1 行
    assert_eq!(outcomes[0].row_number, 2);
    assert_eq!(outcomes[1].row_number, 3);
}

#[test]
fn test_blank_row_keeps_physical_numbering() {
    let env = TestEnv::new();
    let importer = env.importer();
    // 第 3 行为空行: 被跳过但占行号
    let csv = write_csv(&["name", "Alpha SL", ";", "Beta SA"]);

    let report = importer
        .import_with_profile(&name_only_profile(), csv.path())
        .expect("导入失败");

    assert_eq!(report.run.total_rows, 2);
    assert_eq!(report.outcomes[0].row_number, 2);
    assert_eq!(report.outcomes[1].row_number, 4);
}
