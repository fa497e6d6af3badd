// ==========================================
// CSV 配置化导入系统 - 导入器实现
// ==========================================
// 职责: 整合导入流程, 从文件到记录与日志
// 流程: 档案校验 → 解析 → 行映射 → 决策 → 落库 → 日志
// 红线: 行级错误只失败当前行, 不中断整次运行
// ==========================================

use crate::domain::log::{ImportReport, ImportRun, RowOutcome};
use crate::domain::profile::ImportProfile;
use crate::domain::types::RowStatus;
use crate::importer::csv_importer_trait::CsvImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::FileParser;
use crate::importer::row_mapper::RowMapper;
use crate::importer::upsert_resolver::{UpsertDecision, UpsertResolver};
use crate::repository::error::StoreError;
use crate::repository::import_log_repo::ImportLogRepository;
use crate::repository::profile_repo::ProfileRepository;
use crate::repository::record_store::{RecordId, RecordStore};
use crate::schema::registry::SchemaRegistry;
use crate::schema::validate::{validate_profile, ProfileError};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// CsvImporterImpl
// ==========================================
pub struct CsvImporterImpl<S, P, L>
where
    S: RecordStore,
    P: ProfileRepository,
    L: ImportLogRepository,
{
    // 数据访问层
    store: S,
    profile_repo: P,
    log_repo: L,

    // 模型注册表
    registry: Arc<SchemaRegistry>,

    // 文件解析器
    file_parser: Box<dyn FileParser>,
}

impl<S, P, L> CsvImporterImpl<S, P, L>
where
    S: RecordStore,
    P: ProfileRepository,
    L: ImportLogRepository,
{
    pub fn new(
        store: S,
        profile_repo: P,
        log_repo: L,
        registry: Arc<SchemaRegistry>,
        file_parser: Box<dyn FileParser>,
    ) -> Self {
        Self {
            store,
            profile_repo,
            log_repo,
            registry,
            file_parser,
        }
    }

    /// 处理单行: 映射 → 决策 → 落库
    fn process_row(
        &self,
        profile: &ImportProfile,
        mapper: &RowMapper<'_>,
        row: &[String],
        row_number: usize,
    ) -> ImportResult<(RowStatus, Option<RecordId>, Option<String>)> {
        let payload = mapper.map_row(profile, row, row_number)?;
        let decision = UpsertResolver::resolve(&self.store, profile, &payload, row_number)?;

        match decision {
            UpsertDecision::Create => {
                let id = self.store.create(&payload)?;
                Ok((RowStatus::Created, Some(id), None))
            }
            UpsertDecision::Update(id) => match self.store.update(id, &payload) {
                Ok(()) => Ok((RowStatus::Updated, Some(id), None)),
                // 状态禁写必须显式失败, 不允许静默跳过
                Err(StoreError::WriteForbidden { model, id, state }) => {
                    Err(ImportError::WritePermissionError {
                        row: row_number,
                        model,
                        record_id: id,
                        state,
                    })
                }
                Err(e) => Err(e.into()),
            },
            UpsertDecision::Skip(id) => Ok((
                RowStatus::Skipped,
                Some(id),
                Some("已存在, 按档案策略跳过".to_string()),
            )),
        }
    }
}

impl<S, P, L> CsvImporter for CsvImporterImpl<S, P, L>
where
    S: RecordStore,
    P: ProfileRepository,
    L: ImportLogRepository,
{
    fn import_file(&self, profile_name: &str, file_path: &Path) -> ImportResult<ImportReport> {
        let profile = self
            .profile_repo
            .get(profile_name)?
            .ok_or_else(|| ImportError::ProfileNotFound(profile_name.to_string()))?;
        self.import_with_profile(&profile, file_path)
    }

    #[instrument(skip(self, profile, file_path), fields(run_id, profile = %profile.name))]
    fn import_with_profile(
        &self,
        profile: &ImportProfile,
        file_path: &Path,
    ) -> ImportResult<ImportReport> {
        let start_time = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());
        info!(
            run_id = %run_id,
            model = %profile.model,
            file = %file_path.display(),
            "开始 CSV 导入"
        );

        // === 阶段 1: 档案校验 ===
        if !profile.active {
            return Err(ProfileError::InactiveProfile(profile.name.clone()).into());
        }
        validate_profile(profile, &self.registry)?;
        debug!("档案校验通过");

        // === 阶段 2: 文件解析 ===
        let rows = self.file_parser.parse_rows(file_path, &profile.dialect)?;
        info!(total_rows = rows.len(), "文件解析完成");

        // === 阶段 3-5: 逐行处理 ===
        let mapper = RowMapper::new(&self.registry);
        let mut outcomes = Vec::with_capacity(rows.len());

        for row in &rows {
            // 行号由解析器按文件物理行给出
            let row_number = row.number;
            let raw_row =
                serde_json::to_string(&row.cells).unwrap_or_else(|_| "[]".to_string());

            let outcome = match self.process_row(profile, &mapper, &row.cells, row_number) {
                Ok((status, record_id, message)) => {
                    let mut outcome = RowOutcome::new(&run_id, row_number, status, raw_row);
                    outcome.record_id = record_id;
                    outcome.message = message;
                    outcome
                }
                Err(e) => {
                    warn!(row = row_number, error = %e, "行处理失败");
                    RowOutcome::new(&run_id, row_number, RowStatus::Failed, raw_row)
                        .with_message(e.to_string())
                }
            };
            outcomes.push(outcome);
        }

        let finished_at = Utc::now();
        let elapsed = start_time.elapsed();

        // === 批次汇总与落日志 ===
        let count =
            |status: RowStatus| outcomes.iter().filter(|o| o.status == status).count() as i32;
        let run = ImportRun {
            run_id: run_id.clone(),
            profile_name: profile.name.clone(),
            model: profile.model.clone(),
            file_name,
            total_rows: outcomes.len() as i32,
            created_rows: count(RowStatus::Created),
            updated_rows: count(RowStatus::Updated),
            skipped_rows: count(RowStatus::Skipped),
            failed_rows: count(RowStatus::Failed),
            started_at,
            finished_at: Some(finished_at),
            elapsed_ms: Some(elapsed.as_millis() as i64),
        };

        self.log_repo.insert_run(&run)?;
        self.log_repo.insert_outcomes(&outcomes)?;

        info!(
            run_id = %run_id,
            total = run.total_rows,
            created = run.created_rows,
            updated = run.updated_rows,
            skipped = run.skipped_rows,
            failed = run.failed_rows,
            elapsed_ms = elapsed.as_millis() as u64,
            "CSV 导入完成"
        );

        Ok(ImportReport { run, outcomes })
    }
}
