// ==========================================
// CSV 配置化导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::profile::CsvDialect;
use crate::domain::types::{
    CharacterEncoding, DecimalSeparator, LinkPolicy, Separator, ThousandsSeparator,
};
use crate::repository::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

// ===== 配置键 =====
const KEY_DEFAULT_SEPARATOR: &str = "csv.default_separator";
const KEY_DEFAULT_QUOTE: &str = "csv.default_quote";
const KEY_DEFAULT_HEADER: &str = "csv.default_header";
const KEY_DEFAULT_ENCODING: &str = "csv.default_encoding";
const KEY_THOUSANDS_SEPARATOR: &str = "csv.thousands_separator";
const KEY_DECIMAL_SEPARATOR: &str = "csv.decimal_separator";
const KEY_LINK_POLICY: &str = "import.link_policy";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> StoreResult<Self> {
        let conn =
            open_sqlite_connection(db_path).map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> StoreResult<Self> {
        let manager = Self { conn };
        manager.ensure_schema()?;
        Ok(manager)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config_kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )?;
        Ok(())
    }

    /// 读取配置值(缺失返回 None)
    pub fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值(覆盖)
    pub fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO config_kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl ImportConfigReader for ConfigManager {
    /// 新建档案的默认方言: 未配置的键沿用历史默认值
    fn default_dialect(&self) -> StoreResult<CsvDialect> {
        let mut dialect = CsvDialect::default();

        if let Some(raw) = self.get_value(KEY_DEFAULT_SEPARATOR)? {
            dialect.separator = Separator::from_code(&raw)
                .ok_or_else(|| StoreError::ColumnFormatError(raw.clone()))?;
        }
        if let Some(raw) = self.get_value(KEY_DEFAULT_QUOTE)? {
            dialect.quote = raw.chars().next();
        }
        if let Some(raw) = self.get_value(KEY_DEFAULT_HEADER)? {
            dialect.header = raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true");
        }
        if let Some(raw) = self.get_value(KEY_DEFAULT_ENCODING)? {
            dialect.encoding = CharacterEncoding::from_code(&raw)
                .ok_or_else(|| StoreError::ColumnFormatError(raw.clone()))?;
        }
        if let Some(raw) = self.get_value(KEY_THOUSANDS_SEPARATOR)? {
            dialect.thousands_separator = ThousandsSeparator::from_code(&raw)
                .ok_or_else(|| StoreError::ColumnFormatError(raw.clone()))?;
        }
        if let Some(raw) = self.get_value(KEY_DECIMAL_SEPARATOR)? {
            dialect.decimal_separator = DecimalSeparator::from_code(&raw)
                .ok_or_else(|| StoreError::ColumnFormatError(raw.clone()))?;
        }

        Ok(dialect)
    }

    /// many2one 无匹配时的解析策略(默认自动创建)
    fn link_policy(&self) -> StoreResult<LinkPolicy> {
        match self.get_value(KEY_LINK_POLICY)? {
            Some(raw) => LinkPolicy::from_code(&raw)
                .ok_or_else(|| StoreError::ColumnFormatError(raw.clone())),
            None => Ok(LinkPolicy::CreateMissing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn manager() -> (NamedTempFile, ConfigManager) {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap().to_string();
        (temp, ConfigManager::new(&path).unwrap())
    }

    #[test]
    fn test_defaults_without_config() {
        let (_temp, manager) = manager();
        let dialect = manager.default_dialect().unwrap();
        assert_eq!(dialect, CsvDialect::default());
        assert_eq!(manager.link_policy().unwrap(), LinkPolicy::CreateMissing);
    }

    #[test]
    fn test_overrides() {
        let (_temp, manager) = manager();
        manager.set_value("csv.default_separator", ",").unwrap();
        manager.set_value("csv.default_header", "0").unwrap();
        manager.set_value("import.link_policy", "fail").unwrap();

        let dialect = manager.default_dialect().unwrap();
        assert_eq!(dialect.separator, Separator::Comma);
        assert!(!dialect.header);
        assert_eq!(manager.link_policy().unwrap(), LinkPolicy::Fail);
    }

    #[test]
    fn test_invalid_value_reported() {
        let (_temp, manager) = manager();
        manager.set_value("csv.default_separator", "##").unwrap();
        assert!(manager.default_dialect().is_err());
    }
}
