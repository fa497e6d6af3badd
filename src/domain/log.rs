// ==========================================
// CSV 配置化导入系统 - 导入日志领域模型
// ==========================================
// 职责: 一次导入运行的批次信息与逐行结果
// 对齐: import_run / import_row_log 表
// ==========================================

use crate::domain::types::RowStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportRun - 导入运行批次
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,
    pub profile_name: String,
    pub model: String,
    pub file_name: Option<String>,

    // ===== 逐状态计数 =====
    pub total_rows: i32,
    pub created_rows: i32,
    pub updated_rows: i32,
    pub skipped_rows: i32,
    pub failed_rows: i32,

    // ===== 审计字段 =====
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: Option<i64>,
}

// ==========================================
// RowOutcome - 单行处理结果
// ==========================================
// raw_row: 原始单元格的 JSON 快照, 便于排查失败行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowOutcome {
    pub run_id: String,
    pub row_number: usize,
    pub status: RowStatus,
    pub record_id: Option<i64>,
    pub message: Option<String>,
    pub raw_row: String,
    pub created_at: DateTime<Utc>,
}

impl RowOutcome {
    pub fn new(run_id: &str, row_number: usize, status: RowStatus, raw_row: String) -> Self {
        Self {
            run_id: run_id.to_string(),
            row_number,
            status,
            record_id: None,
            message: None,
            raw_row,
            created_at: Utc::now(),
        }
    }

    pub fn with_record(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }
}

// ==========================================
// ImportReport - 导入结果(批次 + 逐行)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub run: ImportRun,
    pub outcomes: Vec<RowOutcome>,
}

impl ImportReport {
    /// 按状态统计行数
    pub fn count(&self, status: RowStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}
