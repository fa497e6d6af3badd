// ==========================================
// CSV 配置化导入系统 - 导入档案仓储
// ==========================================
// 职责: csv_profile / csv_profile_column 表的 CRUD
// 红线: 仓储不含校验逻辑, 档案一致性由 schema::validate 负责
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::profile::{ColumnMapping, CsvDialect, ImportProfile};
use crate::domain::types::{
    CharacterEncoding, DecimalSeparator, Separator, ThousandsSeparator,
};
use crate::repository::error::{StoreError, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ProfileRepository Trait
// ==========================================
pub trait ProfileRepository: Send + Sync {
    /// 保存档案(同名覆盖, 列映射整体重写)
    fn save(&self, profile: &ImportProfile) -> StoreResult<()>;

    /// 按名称读取档案
    fn get(&self, name: &str) -> StoreResult<Option<ImportProfile>>;

    /// 列出启用的档案名
    fn list_active(&self) -> StoreResult<Vec<String>>;

    /// 删除档案
    fn delete(&self, name: &str) -> StoreResult<()>;
}

// ==========================================
// SqliteProfileRepository
// ==========================================
pub struct SqliteProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileRepository {
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
            CREATE TABLE IF NOT EXISTS csv_profile (
                name                TEXT PRIMARY KEY,
                model               TEXT NOT NULL,
                separator           TEXT NOT NULL,
                quote               TEXT,
                header              INTEGER NOT NULL,
                encoding            TEXT NOT NULL,
                thousands_separator TEXT NOT NULL,
                decimal_separator   TEXT NOT NULL,
                update_existing     INTEGER NOT NULL,
                skip_existing       INTEGER NOT NULL,
                active              INTEGER NOT NULL,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS csv_profile_column (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                profile_name  TEXT NOT NULL REFERENCES csv_profile(name) ON DELETE CASCADE,
                seq           INTEGER NOT NULL,
                positions     TEXT NOT NULL,
                field         TEXT NOT NULL,
                sub_field     TEXT,
                date_format   TEXT,
                is_search_key INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_profile_column_profile
                ON csv_profile_column(profile_name, seq);
            "#,
        )?;
        Ok(())
    }

    /// 列位置 "0,1" → Vec<usize>(沿用历史档案的逗号分隔存法)
    fn parse_positions(raw: &str) -> StoreResult<Vec<usize>> {
        raw.split(',')
            .map(|cell| {
                cell.trim()
                    .parse::<usize>()
                    .map_err(|_| StoreError::ColumnFormatError(raw.to_string()))
            })
            .collect()
    }

    fn format_positions(positions: &[usize]) -> String {
        positions
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl ProfileRepository for SqliteProfileRepository {
    fn save(&self, profile: &ImportProfile) -> StoreResult<()> {
        let conn = self.lock()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            r#"
            INSERT INTO csv_profile (
                name, model, separator, quote, header, encoding,
                thousands_separator, decimal_separator,
                update_existing, skip_existing, active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            ON CONFLICT(name) DO UPDATE SET
                model = excluded.model,
                separator = excluded.separator,
                quote = excluded.quote,
                header = excluded.header,
                encoding = excluded.encoding,
                thousands_separator = excluded.thousands_separator,
                decimal_separator = excluded.decimal_separator,
                update_existing = excluded.update_existing,
                skip_existing = excluded.skip_existing,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
            params![
                profile.name,
                profile.model,
                profile.dialect.separator.as_str(),
                profile.dialect.quote.map(|q| q.to_string()),
                profile.dialect.header,
                profile.dialect.encoding.as_str(),
                profile.dialect.thousands_separator.as_str(),
                profile.dialect.decimal_separator.as_str(),
                profile.update_existing,
                profile.skip_existing,
                profile.active,
                now,
            ],
        )?;

        // 列映射整体重写, 保持声明顺序
        tx.execute(
            "DELETE FROM csv_profile_column WHERE profile_name = ?1",
            params![profile.name],
        )?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO csv_profile_column (
                    profile_name, seq, positions, field, sub_field, date_format, is_search_key
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (seq, column) in profile.columns.iter().enumerate() {
                stmt.execute(params![
                    profile.name,
                    seq as i64,
                    Self::format_positions(&column.positions),
                    column.field,
                    column.sub_field,
                    column.date_format,
                    column.is_search_key,
                ])?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::TransactionError(e.to_string()))?;
        Ok(())
    }

    fn get(&self, name: &str) -> StoreResult<Option<ImportProfile>> {
        let conn = self.lock()?;

        let head = conn
            .query_row(
                r#"
                SELECT model, separator, quote, header, encoding,
                       thousands_separator, decimal_separator,
                       update_existing, skip_existing, active
                FROM csv_profile WHERE name = ?1
                "#,
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, bool>(8)?,
                        row.get::<_, bool>(9)?,
                    ))
                },
            )
            .optional()?;

        let Some((
            model,
            separator,
            quote,
            header,
            encoding,
            thousands,
            decimal,
            update_existing,
            skip_existing,
            active,
        )) = head
        else {
            return Ok(None);
        };

        let dialect = CsvDialect {
            separator: Separator::from_code(&separator)
                .ok_or_else(|| StoreError::ColumnFormatError(separator.clone()))?,
            quote: quote.and_then(|q| q.chars().next()),
            header,
            encoding: CharacterEncoding::from_code(&encoding)
                .ok_or_else(|| StoreError::ColumnFormatError(encoding.clone()))?,
            thousands_separator: ThousandsSeparator::from_code(&thousands)
                .ok_or_else(|| StoreError::ColumnFormatError(thousands.clone()))?,
            decimal_separator: DecimalSeparator::from_code(&decimal)
                .ok_or_else(|| StoreError::ColumnFormatError(decimal.clone()))?,
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT positions, field, sub_field, date_format, is_search_key
            FROM csv_profile_column
            WHERE profile_name = ?1
            ORDER BY seq
            "#,
        )?;
        let rows = stmt.query_map(params![name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (positions, field, sub_field, date_format, is_search_key) = row?;
            columns.push(ColumnMapping {
                positions: Self::parse_positions(&positions)?,
                field,
                sub_field,
                date_format,
                is_search_key,
            });
        }

        Ok(Some(ImportProfile {
            name: name.to_string(),
            model,
            dialect,
            columns,
            update_existing,
            skip_existing,
            active,
        }))
    }

    fn list_active(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT name FROM csv_profile WHERE active = 1 ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM csv_profile_column WHERE profile_name = ?1",
            params![name],
        )?;
        conn.execute("DELETE FROM csv_profile WHERE name = ?1", params![name])?;
        Ok(())
    }
}
