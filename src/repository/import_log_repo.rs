// ==========================================
// CSV 配置化导入系统 - 导入日志仓储
// ==========================================
// 职责: import_run / import_row_log 表的写入与查询
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::log::{ImportRun, RowOutcome};
use crate::domain::types::RowStatus;
use crate::repository::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ImportLogRepository Trait
// ==========================================
pub trait ImportLogRepository: Send + Sync {
    /// 写入运行批次
    fn insert_run(&self, run: &ImportRun) -> StoreResult<()>;

    /// 批量写入逐行结果(事务化)
    fn insert_outcomes(&self, outcomes: &[RowOutcome]) -> StoreResult<usize>;

    /// 按 run_id 读取批次
    fn get_run(&self, run_id: &str) -> StoreResult<Option<ImportRun>>;

    /// 按 run_id 读取逐行结果(按行号排序)
    fn outcomes_for_run(&self, run_id: &str) -> StoreResult<Vec<RowOutcome>>;
}

// ==========================================
// SqliteImportLogRepository
// ==========================================
pub struct SqliteImportLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteImportLogRepository {
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn =
            open_sqlite_connection(db_path).map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let repo = Self { conn };
        repo.ensure_schema()?;
        Ok(repo)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS import_run (
                run_id       TEXT PRIMARY KEY,
                profile_name TEXT NOT NULL,
                model        TEXT NOT NULL,
                file_name    TEXT,
                total_rows   INTEGER NOT NULL,
                created_rows INTEGER NOT NULL,
                updated_rows INTEGER NOT NULL,
                skipped_rows INTEGER NOT NULL,
                failed_rows  INTEGER NOT NULL,
                started_at   TEXT NOT NULL,
                finished_at  TEXT,
                elapsed_ms   INTEGER
            );
            CREATE TABLE IF NOT EXISTS import_row_log (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id     TEXT NOT NULL REFERENCES import_run(run_id),
                row_number INTEGER NOT NULL,
                status     TEXT NOT NULL,
                record_id  INTEGER,
                message    TEXT,
                raw_row    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_row_log_run
                ON import_row_log(run_id, row_number);
            "#,
        )?;
        Ok(())
    }

    fn parse_datetime(raw: &str) -> StoreResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::QueryError(format!("时间戳解析失败: {}", e)))
    }
}

impl ImportLogRepository for SqliteImportLogRepository {
    fn insert_run(&self, run: &ImportRun) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO import_run (
                run_id, profile_name, model, file_name,
                total_rows, created_rows, updated_rows, skipped_rows, failed_rows,
                started_at, finished_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                run.run_id,
                run.profile_name,
                run.model,
                run.file_name,
                run.total_rows,
                run.created_rows,
                run.updated_rows,
                run.skipped_rows,
                run.failed_rows,
                run.started_at.to_rfc3339(),
                run.finished_at.map(|dt| dt.to_rfc3339()),
                run.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    fn insert_outcomes(&self, outcomes: &[RowOutcome]) -> StoreResult<usize> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO import_row_log (
                    run_id, row_number, status, record_id, message, raw_row, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for outcome in outcomes {
                stmt.execute(params![
                    outcome.run_id,
                    outcome.row_number as i64,
                    outcome.status.as_str(),
                    outcome.record_id,
                    outcome.message,
                    outcome.raw_row,
                    outcome.created_at.to_rfc3339(),
                ])?;
                count += 1;
            }
        }
        tx.commit()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        Ok(count)
    }

    fn get_run(&self, run_id: &str) -> StoreResult<Option<ImportRun>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                r#"
                SELECT profile_name, model, file_name,
                       total_rows, created_rows, updated_rows, skipped_rows, failed_rows,
                       started_at, finished_at, elapsed_ms
                FROM import_run WHERE run_id = ?1
                "#,
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i32>(3)?,
                        row.get::<_, i32>(4)?,
                        row.get::<_, i32>(5)?,
                        row.get::<_, i32>(6)?,
                        row.get::<_, i32>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, Option<String>>(9)?,
                        row.get::<_, Option<i64>>(10)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            profile_name,
            model,
            file_name,
            total_rows,
            created_rows,
            updated_rows,
            skipped_rows,
            failed_rows,
            started_at,
            finished_at,
            elapsed_ms,
        )) = row
        else {
            return Ok(None);
        };

        Ok(Some(ImportRun {
            run_id: run_id.to_string(),
            profile_name,
            model,
            file_name,
            total_rows,
            created_rows,
            updated_rows,
            skipped_rows,
            failed_rows,
            started_at: Self::parse_datetime(&started_at)?,
            finished_at: finished_at.map(|s| Self::parse_datetime(&s)).transpose()?,
            elapsed_ms,
        }))
    }

    fn outcomes_for_run(&self, run_id: &str) -> StoreResult<Vec<RowOutcome>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT row_number, status, record_id, message, raw_row, created_at
            FROM import_row_log
            WHERE run_id = ?1
            ORDER BY row_number
            "#,
        )?;
        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut outcomes = Vec::new();
        for row in rows {
            let (row_number, status, record_id, message, raw_row, created_at) = row?;
            outcomes.push(RowOutcome {
                run_id: run_id.to_string(),
                row_number: row_number as usize,
                status: RowStatus::from_code(&status),
                record_id,
                message,
                raw_row,
                created_at: Self::parse_datetime(&created_at)?,
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn repo() -> (NamedTempFile, SqliteImportLogRepository) {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        (temp, SqliteImportLogRepository::new(&path).unwrap())
    }

    fn sample_run(run_id: &str) -> ImportRun {
        ImportRun {
            run_id: run_id.to_string(),
            profile_name: "party_import".to_string(),
            model: "party".to_string(),
            file_name: Some("parties.csv".to_string()),
            total_rows: 3,
            created_rows: 2,
            updated_rows: 0,
            skipped_rows: 0,
            failed_rows: 1,
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            elapsed_ms: Some(12),
        }
    }

    #[test]
    fn test_run_roundtrip() {
        let (_temp, repo) = repo();
        let run = sample_run("run-1");
        repo.insert_run(&run).unwrap();

        let restored = repo.get_run("run-1").unwrap().unwrap();
        assert_eq!(restored.profile_name, "party_import");
        assert_eq!(restored.total_rows, 3);
        assert_eq!(restored.failed_rows, 1);
        assert!(repo.get_run("missing").unwrap().is_none());
    }

    #[test]
    fn test_outcomes_ordered_by_row() {
        let (_temp, repo) = repo();
        repo.insert_run(&sample_run("run-2")).unwrap();

        let outcomes = vec![
            RowOutcome::new("run-2", 2, RowStatus::Failed, "[]".to_string())
                .with_message("字段映射失败".to_string()),
            RowOutcome::new("run-2", 1, RowStatus::Created, "[]".to_string()).with_record(7),
        ];
        assert_eq!(repo.insert_outcomes(&outcomes).unwrap(), 2);

        let restored = repo.outcomes_for_run("run-2").unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].row_number, 1);
        assert_eq!(restored[0].status, RowStatus::Created);
        assert_eq!(restored[0].record_id, Some(7));
        assert_eq!(restored[1].status, RowStatus::Failed);
        assert_eq!(restored[1].message.as_deref(), Some("字段映射失败"));
    }
}
