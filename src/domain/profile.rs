// ==========================================
// CSV 配置化导入系统 - 导入档案领域模型
// ==========================================
// 职责: 描述一份可复用的 CSV 导入配置
// 用途: 档案仓储写入, 导入管道只读
// 对齐: csv_profile / csv_profile_column 表
// ==========================================

use crate::domain::types::{
    CharacterEncoding, DecimalSeparator, Separator, ThousandsSeparator,
};
use serde::{Deserialize, Serialize};

// ==========================================
// CsvDialect - CSV 方言
// ==========================================
// 默认值与历史档案保持一致: 分号分隔, 双引号包裹,
// 首行为表头, UTF-8, 千分位 '.', 小数点 ','
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvDialect {
    pub separator: Separator,
    pub quote: Option<char>,
    pub header: bool,
    pub encoding: CharacterEncoding,
    pub thousands_separator: ThousandsSeparator,
    pub decimal_separator: DecimalSeparator,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            separator: Separator::Semicolon,
            quote: Some('"'),
            header: true,
            encoding: CharacterEncoding::Utf8,
            thousands_separator: ThousandsSeparator::Dot,
            decimal_separator: DecimalSeparator::Comma,
        }
    }
}

// ==========================================
// ColumnMapping - 列映射
// ==========================================
// positions: CSV 列位置(0 起), 多列映射时按序拼接单元格
//            (如日期+时间分占两列)
// sub_field: 关系字段的子字段名(标量字段禁止填写)
// date_format: strptime 格式, 多列映射用逗号分段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub positions: Vec<usize>,
    pub field: String,
    pub sub_field: Option<String>,
    pub date_format: Option<String>,
    pub is_search_key: bool,
}

impl ColumnMapping {
    /// 标量字段的单列映射
    pub fn scalar(position: usize, field: &str) -> Self {
        Self {
            positions: vec![position],
            field: field.to_string(),
            sub_field: None,
            date_format: None,
            is_search_key: false,
        }
    }

    /// 关系字段的单列映射(指定子字段)
    pub fn relational(position: usize, field: &str, sub_field: &str) -> Self {
        Self {
            positions: vec![position],
            field: field.to_string(),
            sub_field: Some(sub_field.to_string()),
            date_format: None,
            is_search_key: false,
        }
    }

    /// 标记为查找键
    pub fn search_key(mut self) -> Self {
        self.is_search_key = true;
        self
    }

    /// 指定日期格式
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = Some(format.to_string());
        self
    }
}

// ==========================================
// ImportProfile - 导入档案
// ==========================================
// 红线: 列映射的顺序即 CSV 处理顺序, 不允许重排
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProfile {
    pub name: String,
    pub model: String,
    pub dialect: CsvDialect,
    pub columns: Vec<ColumnMapping>,
    pub update_existing: bool,
    pub skip_existing: bool,
    pub active: bool,
}

impl ImportProfile {
    /// 创建使用默认方言的新档案
    pub fn new(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            dialect: CsvDialect::default(),
            columns: Vec::new(),
            update_existing: false,
            skip_existing: false,
            active: true,
        }
    }

    /// 追加列映射(保持声明顺序)
    pub fn with_column(mut self, column: ColumnMapping) -> Self {
        self.columns.push(column);
        self
    }

    /// 查找键列(参与匹配域构建)
    pub fn search_key_columns(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.columns.iter().filter(|c| c.is_search_key)
    }

    pub fn has_search_keys(&self) -> bool {
        self.columns.iter().any(|c| c.is_search_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_defaults() {
        let dialect = CsvDialect::default();
        assert_eq!(dialect.separator, Separator::Semicolon);
        assert_eq!(dialect.quote, Some('"'));
        assert!(dialect.header);
        assert_eq!(dialect.encoding, CharacterEncoding::Utf8);
    }

    #[test]
    fn test_profile_search_keys() {
        let profile = ImportProfile::new("party_import", "party")
            .with_column(ColumnMapping::scalar(0, "name").search_key())
            .with_column(ColumnMapping::scalar(1, "notes"));

        assert!(profile.has_search_keys());
        let keys: Vec<_> = profile.search_key_columns().collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].field, "name");
    }

    #[test]
    fn test_column_order_preserved() {
        let profile = ImportProfile::new("p", "party")
            .with_column(ColumnMapping::scalar(2, "b"))
            .with_column(ColumnMapping::scalar(0, "a"));
        assert_eq!(profile.columns[0].field, "b");
        assert_eq!(profile.columns[1].field, "a");
    }
}
